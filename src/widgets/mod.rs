pub mod chrome;
pub mod form;
pub mod form_widget;
pub mod header;
pub mod status_bar;
pub mod tab_bar;
