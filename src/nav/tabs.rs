use crate::nav::flatten::row_of_uid;
use crate::widgets::form::FormState;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingFocus {
    uid: u64,
    tab: usize,
}

/// Active tab plus a focus request waiting for the next render pass.
#[derive(Debug, Default)]
pub struct TabNavigator {
    active: usize,
    pending: Option<PendingFocus>,
}

impl TabNavigator {
    pub fn active(&self) -> usize {
        self.active
    }

    pub fn has_pending_focus(&self) -> bool {
        self.pending.is_some()
    }

    pub fn visible_tabs(form: &FormState) -> Vec<usize> {
        (0..form.tabs.len()).filter(|&i| form.tab_visible(i)).collect()
    }

    /// Land on the first visible tab.
    pub fn reset(&mut self, form: &mut FormState) {
        if let Some(&first) = Self::visible_tabs(form).first() {
            self.show_section(form, first);
        }
    }

    /// Activate a tab. Hidden or unknown tabs are ignored and `false` is returned.
    pub fn show_section(&mut self, form: &mut FormState, index: usize) -> bool {
        if !form.tab_visible(index) {
            debug!(tab = index, "ignoring hidden tab");
            return false;
        }
        if self.active != index {
            self.active = index;
            form.selected = 0;
            form.scroll = 0;
            form.editing = false;
        }
        true
    }

    /// Show the field's tab and remember the field; [`settle`] moves the cursor.
    /// A later call replaces an earlier one.
    ///
    /// [`settle`]: TabNavigator::settle
    pub fn focus_field(&mut self, form: &mut FormState, uid: u64, tab: usize) {
        if !self.show_section(form, tab) {
            return;
        }
        self.pending = Some(PendingFocus { uid, tab });
    }

    /// Apply the pending focus once the active tab's rows exist. Returns true
    /// when the cursor moved.
    pub fn settle(&mut self, form: &mut FormState) -> bool {
        let Some(p) = self.pending.take() else {
            return false;
        };
        if p.tab != self.active {
            return false;
        }
        match row_of_uid(form, p.tab, p.uid) {
            Some(row) => {
                form.selected = row;
                form.editing = false;
                true
            }
            None => {
                debug!(uid = p.uid, "focus target vanished");
                false
            }
        }
    }

    pub fn next(&mut self, form: &mut FormState) {
        let vis = Self::visible_tabs(form);
        if let Some(&t) = vis.iter().find(|&&t| t > self.active).or(vis.first()) {
            self.show_section(form, t);
        }
    }

    pub fn prev(&mut self, form: &mut FormState) {
        let vis = Self::visible_tabs(form);
        if let Some(&t) = vis.iter().rev().find(|&&t| t < self.active).or(vis.last()) {
            self.show_section(form, t);
        }
    }

    /// F1..Fn map onto the visible tabs in order.
    pub fn function_key(&mut self, form: &mut FormState, n: u8) -> bool {
        let vis = Self::visible_tabs(form);
        match (n as usize).checked_sub(1).and_then(|i| vis.get(i)) {
            Some(&t) => self.show_section(form, t),
            None => false,
        }
    }
}
