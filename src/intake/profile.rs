//! Static description of each form: fields, tables, rules and the payload allow-list.
//!
//! Everything here is `'static` data. The form model is built from it once
//! at startup and the validator, collector and assembler read it directly.

use crate::intake::validator::{Check, Rule, Shape, Target, When};
use crate::widgets::form::{FieldKind, FormField, FormState, TabInfo, TableInfo};
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    Onboarding,
    JobApplication,
}

#[derive(Clone, Copy, Debug)]
pub enum InputKind {
    Text,
    Date,
    TextArea,
    Decimal,
    Integer,
    Checkbox,
    Choice(&'static [&'static str]),
    /// Options come from the configured language list.
    Languages,
    Level(&'static [&'static str]),
    File { multiple: bool },
}

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub tab: usize,
    pub kind: InputKind,
    pub group: Option<&'static str>,
}

impl FieldSpec {
    const fn new(name: &'static str, label: &'static str, tab: usize, kind: InputKind) -> Self {
        Self {
            name,
            label,
            tab,
            kind,
            group: None,
        }
    }

    const fn group(self, group: &'static str) -> Self {
        Self {
            group: Some(group),
            ..self
        }
    }
}

/// Value emitted for an empty cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    Text(&'static str),
    Number(i64),
}

impl Fallback {
    pub fn to_json(self) -> JsonValue {
        match self {
            Fallback::Text(s) => JsonValue::from(s),
            Fallback::Number(n) => JsonValue::from(n),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: InputKind,
    pub fallback: Fallback,
}

const fn col(name: &'static str, label: &'static str, kind: InputKind) -> ColumnSpec {
    ColumnSpec {
        name,
        label,
        kind,
        fallback: Fallback::Text(""),
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TableSpec {
    pub id: &'static str,
    pub title: &'static str,
    pub tab: usize,
    pub columns: &'static [ColumnSpec],
    /// Rows with this column empty are not emitted.
    pub primary: Option<&'static str>,
    pub initial_rows: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotShape {
    /// `{"files_data": [...]}`, or null without a selection.
    FilesData,
    /// Bare descriptor list.
    List,
}

#[derive(Clone, Copy, Debug)]
pub struct SlotSpec {
    pub field: &'static str,
    pub shape: SlotShape,
}

#[derive(Debug)]
pub struct Profile {
    pub title: &'static str,
    pub tabs: &'static [&'static str],
    pub fields: &'static [FieldSpec],
    pub tables: &'static [TableSpec],
    pub rules: &'static [Rule],
    pub allow_list: &'static [&'static str],
    /// (payload key, checkbox field) pairs sent as 1/0.
    pub flags: &'static [(&'static str, &'static str)],
    pub slots: &'static [SlotSpec],
    /// Checkbox that must be ticked for a successful submit to complete.
    pub confirm_field: Option<&'static str>,
    /// Tab the host can hide (current employer).
    pub optional_tab: Option<usize>,
    /// Field the host can hide (national id).
    pub optional_field: Option<&'static str>,
    pub success_text: &'static str,
}

impl Profile {
    pub fn get(kind: ProfileKind) -> &'static Profile {
        match kind {
            ProfileKind::Onboarding => &ONBOARDING,
            ProfileKind::JobApplication => &JOB_APPLICATION,
        }
    }

    /// Tab holding a flat field or a table (by table id).
    pub fn tab_of(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.tab)
            .or_else(|| self.table(name).map(|t| t.tab))
    }

    pub fn table(&self, id: &str) -> Option<&'static TableSpec> {
        self.tables.iter().find(|t| t.id == id)
    }
}

const PERSONAL: usize = 0;
const EMPLOYER: usize = 1;
const BACKGROUND: usize = 2;
const HISTORY: usize = 3;
const DECLARATION: usize = 4;

const LEVELS: &[&str] = &["Excellent", "Good", "Average"];

use InputKind::*;

static ONBOARDING_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("applicant_name", "Full Name", PERSONAL, Text),
    FieldSpec::new("father_name", "Father's Name", PERSONAL, Text),
    FieldSpec::new("date_of_birth", "Date of Birth", PERSONAL, Date),
    FieldSpec::new("gender", "Gender", PERSONAL, Choice(&["Male", "Female", "Other"])),
    FieldSpec::new(
        "marital_status",
        "Marital Status",
        PERSONAL,
        Choice(&["Single", "Married", "Divorced", "Widowed"]),
    ),
    FieldSpec::new("country", "Country", PERSONAL, Text),
    FieldSpec::new("email_id", "Email", PERSONAL, Text),
    FieldSpec::new("phone_number", "Mobile Number", PERSONAL, Text),
    FieldSpec::new("aadhaar_number_input", "Aadhaar Number", PERSONAL, Text),
    FieldSpec::new("current_house_no", "House No.", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("current_street", "Street", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("current_locality", "Locality", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("current_city", "City", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("current_perm_post_office", "Post Office", PERSONAL, Text)
        .group("Current Address"),
    FieldSpec::new("current_district", "District", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("current_state", "State", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("current_pin", "PIN", PERSONAL, Text).group("Current Address"),
    FieldSpec::new("period_years", "Years at Address", PERSONAL, Integer)
        .group("Current Address"),
    FieldSpec::new("current_period_months", "Months at Address", PERSONAL, Integer)
        .group("Current Address"),
    FieldSpec::new("permanent_house_no", "House No.", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("permanent_street", "Street", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("permanent_locality", "Locality", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("permanent_city", "City", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("permanent_perm_post_office", "Post Office", PERSONAL, Text)
        .group("Permanent Address"),
    FieldSpec::new("permanent_district", "District", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("permanent_state", "State", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("permanent_pin", "PIN", PERSONAL, Text).group("Permanent Address"),
    FieldSpec::new("in_india_checkbox", "Willing to work in India", PERSONAL, Checkbox)
        .group("Work Preference"),
    FieldSpec::new("abroad_checkbox", "Willing to work abroad", PERSONAL, Checkbox)
        .group("Work Preference"),
    FieldSpec::new("name_of_employer", "Employer", EMPLOYER, Text),
    FieldSpec::new("current_department", "Department", EMPLOYER, Text),
    FieldSpec::new("current_designation", "Designation", EMPLOYER, Text),
    FieldSpec::new("reports_to", "Reports To", EMPLOYER, Text),
    FieldSpec::new("manager_name", "Manager Name", EMPLOYER, Text),
    FieldSpec::new("manager_contact_no", "Manager Contact No.", EMPLOYER, Text),
    FieldSpec::new("manager_email", "Manager Email", EMPLOYER, Text),
    FieldSpec::new(
        "reference_taken",
        "Reference May Be Taken",
        EMPLOYER,
        Choice(&["Yes", "No"]),
    ),
    FieldSpec::new("address_of_employer", "Employer Address", EMPLOYER, TextArea),
    FieldSpec::new(
        "duties_and_responsibilities",
        "Duties and Responsibilities",
        EMPLOYER,
        TextArea,
    ),
    FieldSpec::new("reason_for_leaving", "Reason for Leaving", EMPLOYER, TextArea),
    FieldSpec::new("agency_details", "Agency Details", EMPLOYER, Text),
    FieldSpec::new("current_salary", "Current Salary", EMPLOYER, Decimal),
    FieldSpec::new("expected_salary", "Expected Salary", EMPLOYER, Decimal),
    FieldSpec::new("payslip_month_1", "Payslip (Month 1)", EMPLOYER, File { multiple: false })
        .group("Payslips"),
    FieldSpec::new("payslip_month_2", "Payslip (Month 2)", EMPLOYER, File { multiple: false })
        .group("Payslips"),
    FieldSpec::new("payslip_month_3", "Payslip (Month 3)", EMPLOYER, File { multiple: false })
        .group("Payslips"),
    FieldSpec::new(
        "achievements_checkbox",
        "Achievements or awards",
        BACKGROUND,
        Checkbox,
    )
    .group("Achievements"),
    FieldSpec::new("other_achievments", "Details", BACKGROUND, TextArea).group("Achievements"),
    FieldSpec::new(
        "interviewed_before_checkbox",
        "Interviewed with us before",
        BACKGROUND,
        Checkbox,
    )
    .group("Previous Interview"),
    FieldSpec::new("position", "Position", BACKGROUND, Text).group("Previous Interview"),
    FieldSpec::new("interviewed_location", "Location", BACKGROUND, Text)
        .group("Previous Interview"),
    FieldSpec::new("interviewed_date", "Date", BACKGROUND, Date).group("Previous Interview"),
    FieldSpec::new("interviewed_outcome", "Outcome", BACKGROUND, Text)
        .group("Previous Interview"),
    FieldSpec::new(
        "related_to_employee_checkbox",
        "Related to an employee",
        BACKGROUND,
        Checkbox,
    )
    .group("Relatives"),
    FieldSpec::new("related_employee", "Employee Name", BACKGROUND, Text).group("Relatives"),
    FieldSpec::new("related_employee_org", "Organisation", BACKGROUND, Text).group("Relatives"),
    FieldSpec::new("related_employee_pos", "Position", BACKGROUND, Text).group("Relatives"),
    FieldSpec::new("related_employee_rel", "Relationship", BACKGROUND, Text).group("Relatives"),
    FieldSpec::new(
        "professional_org_checkbox",
        "Member of a professional organisation",
        BACKGROUND,
        Checkbox,
    )
    .group("Memberships"),
    FieldSpec::new("professional_org", "Professional Organisation", BACKGROUND, Text)
        .group("Memberships"),
    FieldSpec::new(
        "political_org_checkbox",
        "Member of a political organisation",
        BACKGROUND,
        Checkbox,
    )
    .group("Memberships"),
    FieldSpec::new("political_org", "Political Organisation", BACKGROUND, Text)
        .group("Memberships"),
    FieldSpec::new(
        "specialised_training_checkbox",
        "Specialised training",
        BACKGROUND,
        Checkbox,
    )
    .group("Training"),
    FieldSpec::new("specialised_training", "Training Details", BACKGROUND, TextArea)
        .group("Training"),
    FieldSpec::new(
        "was_this_position",
        "How did you hear about this position?",
        BACKGROUND,
        Text,
    )
    .group("Other"),
    FieldSpec::new("state_restriction", "Any state restriction?", BACKGROUND, Text)
        .group("Other"),
    FieldSpec::new("additional_comments", "Additional Comments", DECLARATION, TextArea),
    FieldSpec::new(
        "confirm",
        "I confirm the information provided is accurate",
        DECLARATION,
        Checkbox,
    ),
];

static ONBOARDING_TABLES: &[TableSpec] = &[
    TableSpec {
        id: "language_proficiency",
        title: "Language Proficiency",
        tab: BACKGROUND,
        columns: &[
            col("language", "Language", Languages),
            col("speak", "Speak", Level(LEVELS)),
            col("read", "Read", Level(LEVELS)),
            col("write", "Write", Level(LEVELS)),
        ],
        primary: Some("language"),
        initial_rows: 1,
    },
    TableSpec {
        id: "education_qualification",
        title: "Education",
        tab: HISTORY,
        columns: &[
            col("course", "Course", Text),
            col("name_of_school_college", "School / College", Text),
            col("name_of_universityboard_of_exam", "University / Board", Text),
            col("dates_attended_from", "From", Date),
            col("dates_attended_to", "To", Date),
            col("result", "Result (%)", Decimal),
            col("attachments", "Certificates", File { multiple: true }),
        ],
        primary: None,
        initial_rows: 0,
    },
    TableSpec {
        id: "professional_certification",
        title: "Professional Certifications",
        tab: HISTORY,
        columns: &[
            col("course", "Course", Text),
            col("institute_name", "Institute", Text),
            col("dates_attended_from", "From", Date),
            col("dates_attended_to", "To", Date),
            col("type_of_certification", "Type", Text),
            col("subject_major", "Subject / Major", Text),
            col("attachments", "Certificates", File { multiple: true }),
        ],
        primary: None,
        initial_rows: 0,
    },
    TableSpec {
        id: "prev_emp_his",
        title: "Previous Employment",
        tab: HISTORY,
        columns: &[
            col("name_of_org", "Organisation", Text),
            col("prev_designation", "Designation", Text),
            col("last_salary_drawn", "Last Salary", Decimal),
            col("name_of_manager", "Manager", Text),
            col("period_of_employment", "Period", Text),
            col("reason_for_leaving", "Reason for Leaving", Text),
            col("attachments", "Documents", File { multiple: true }),
        ],
        primary: None,
        initial_rows: 0,
    },
];

const ADDRESS_MSG: [(&str, &str); 5] = [
    ("current_house_no", "Please enter a valid house number."),
    ("current_city", "Please enter a valid city."),
    ("current_perm_post_office", "Please enter a valid post office."),
    ("current_street", "Please enter a valid street."),
    ("current_district", "Please enter a valid district."),
];

static ONBOARDING_RULES: &[Rule] = &[
    Rule::new(
        Target::Field("date_of_birth"),
        Check::Required,
        "Please enter a valid date of birth.",
    ),
    Rule::new(
        Target::Field("aadhaar_number_input"),
        Check::RequiredShape(Shape::Digits(12)),
        "Please enter a valid 12-digit Aadhaar number.",
    )
    .when(When::FieldVisible("aadhaar_number_input")),
    Rule::new(Target::Field(ADDRESS_MSG[0].0), Check::Required, ADDRESS_MSG[0].1),
    Rule::new(Target::Field(ADDRESS_MSG[1].0), Check::Required, ADDRESS_MSG[1].1),
    Rule::new(Target::Field(ADDRESS_MSG[2].0), Check::Required, ADDRESS_MSG[2].1),
    Rule::new(Target::Field(ADDRESS_MSG[3].0), Check::Required, ADDRESS_MSG[3].1),
    Rule::new(Target::Field(ADDRESS_MSG[4].0), Check::Required, ADDRESS_MSG[4].1),
    Rule::new(
        Target::Field("current_pin"),
        Check::RequiredShape(Shape::Digits(6)),
        "Please enter a valid 6-digit PIN.",
    ),
    Rule::new(
        Target::Field("current_locality"),
        Check::Required,
        "Please enter a valid locality.",
    ),
    Rule::new(
        Target::Field("current_state"),
        Check::Required,
        "Please enter a valid state.",
    ),
    Rule::new(
        Target::Field("phone_number"),
        Check::RequiredShape(Shape::Digits(10)),
        "Please enter a valid 10-digit mobile number.",
    ),
    Rule::new(
        Target::Field("email_id"),
        Check::Shape(Shape::Email),
        "Please enter a valid email address.",
    ),
    Rule::new(
        Target::Column {
            table: "education_qualification",
            column: "result",
        },
        Check::AtMost(100.0),
        "Please enter a percentage less than or equal to 100.",
    ),
    Rule::new(
        Target::Field("manager_name"),
        Check::Required,
        "Manager Name is required.",
    )
    .when(When::TabVisible(EMPLOYER)),
    Rule::new(
        Target::Field("manager_contact_no"),
        Check::Required,
        "Manager Contact Number is required.",
    )
    .when(When::TabVisible(EMPLOYER)),
    Rule::new(
        Target::Field("manager_contact_no"),
        Check::Shape(Shape::Digits(10)),
        "Please enter a valid 10-digit mobile number for Manager Contact No.",
    )
    .when(When::TabVisible(EMPLOYER)),
    Rule::new(
        Target::Field("manager_email"),
        Check::Required,
        "Manager Email is required.",
    )
    .when(When::TabVisible(EMPLOYER)),
    Rule::new(
        Target::Field("manager_email"),
        Check::Shape(Shape::Email),
        "Please enter a valid manager email address.",
    )
    .when(When::TabVisible(EMPLOYER)),
    Rule::new(
        Target::Group(&["payslip_month_1", "payslip_month_2", "payslip_month_3"]),
        Check::FileSelected,
        "Please upload last 3 months payslips.",
    )
    .when(When::TabVisible(EMPLOYER)),
    Rule::new(
        Target::Column {
            table: "language_proficiency",
            column: "language",
        },
        Check::RequiredIfAnySet(&["speak", "read", "write"]),
        "Please select a language.",
    ),
    Rule::new(
        Target::Group(&["other_achievments"]),
        Check::Required,
        "Please provide details of your achievements or awards.",
    )
    .when(When::Checked("achievements_checkbox")),
    Rule::new(
        Target::Group(&[
            "position",
            "interviewed_location",
            "interviewed_date",
            "interviewed_outcome",
        ]),
        Check::Required,
        "Please fill all interview details.",
    )
    .when(When::Checked("interviewed_before_checkbox")),
    Rule::new(
        Target::Group(&["related_employee", "related_employee_org", "related_employee_pos"]),
        Check::Required,
        "Please fill all related employee details.",
    )
    .when(When::Checked("related_to_employee_checkbox")),
    Rule::new(
        Target::Group(&["professional_org"]),
        Check::Required,
        "Please provide details of the Professional Organization.",
    )
    .when(When::Checked("professional_org_checkbox")),
    Rule::new(
        Target::Group(&["political_org"]),
        Check::Required,
        "Please provide details of the Political Organization.",
    )
    .when(When::Checked("political_org_checkbox")),
    Rule::new(
        Target::Group(&["specialised_training"]),
        Check::Required,
        "Please provide details of the Specialized Training.",
    )
    .when(When::Checked("specialised_training_checkbox")),
];

static ONBOARDING_ALLOW_LIST: &[&str] = &[
    "father_name",
    "applicant_name",
    "date_of_birth",
    "gender",
    "country",
    "marital_status",
    "current_house_no",
    "current_city",
    "current_perm_post_office",
    "current_street",
    "current_district",
    "current_pin",
    "current_locality",
    "current_state",
    "period_years",
    "current_period_months",
    "permanent_house_no",
    "permanent_city",
    "permanent_perm_post_office",
    "permanent_street",
    "permanent_district",
    "permanent_pin",
    "permanent_locality",
    "permanent_state",
    "email_id",
    "aadhaar_number_input",
    "name_of_employer",
    "current_department",
    "current_designation",
    "reports_to",
    "manager_name",
    "manager_contact_no",
    "manager_email",
    "reference_taken",
    "address_of_employer",
    "duties_and_responsibilities",
    "reason_for_leaving",
    "agency_details",
    "current_salary",
    "expected_salary",
    "other_achievments",
    "position",
    "interviewed_location",
    "interviewed_date",
    "interviewed_outcome",
    "related_employee",
    "related_employee_org",
    "related_employee_pos",
    "related_employee_rel",
    "professional_org",
    "political_org",
    "specialised_training",
    "was_this_position",
    "state_restriction",
    "achievements_checkbox",
    "interviewed_before_checkbox",
    "related_to_employee_checkbox",
    "professional_org_checkbox",
    "political_org_checkbox",
    "specialised_training_checkbox",
    "additional_comments",
    "phone_number",
];

static ONBOARDING: Profile = Profile {
    title: "Employee Onboarding",
    tabs: &[
        "Personal",
        "Current Employer",
        "Background",
        "Education & History",
        "Declaration",
    ],
    fields: ONBOARDING_FIELDS,
    tables: ONBOARDING_TABLES,
    rules: ONBOARDING_RULES,
    allow_list: ONBOARDING_ALLOW_LIST,
    flags: &[
        ("in_india", "in_india_checkbox"),
        ("abroad", "abroad_checkbox"),
        ("is_form_submitted", "confirm"),
    ],
    slots: &[
        SlotSpec {
            field: "payslip_month_1",
            shape: SlotShape::FilesData,
        },
        SlotSpec {
            field: "payslip_month_2",
            shape: SlotShape::FilesData,
        },
        SlotSpec {
            field: "payslip_month_3",
            shape: SlotShape::FilesData,
        },
    ],
    confirm_field: Some("confirm"),
    optional_tab: Some(EMPLOYER),
    optional_field: Some("aadhaar_number_input"),
    success_text: "Your onboarding details have been submitted.",
};

static JOB_APPLICATION: Profile = Profile {
    title: "Job Application",
    tabs: &["Application"],
    fields: &[
        FieldSpec::new("applicant_name", "Full Name", 0, Text),
        FieldSpec::new("email_id", "Email", 0, Text),
        FieldSpec::new("phone_number", "Phone Number", 0, Text),
        FieldSpec::new("min_experience", "Experience (years)", 0, Text),
        FieldSpec::new("min_education_qual", "Highest Qualification", 0, Text),
        FieldSpec::new("job_title", "Job Title", 0, Text),
        FieldSpec::new("location", "Preferred Location", 0, Text),
        FieldSpec::new("resume_attachment", "Resume", 0, File { multiple: true }),
    ],
    tables: &[TableSpec {
        id: "skill_proficiency",
        title: "Skills",
        tab: 0,
        columns: &[
            col("skill", "Skill", Text),
            ColumnSpec {
                name: "rating",
                label: "Rating",
                kind: Level(&["1", "2", "3", "4", "5"]),
                fallback: Fallback::Number(0),
            },
        ],
        primary: Some("skill"),
        initial_rows: 1,
    }],
    rules: &[
        Rule::new(
            Target::Field("email_id"),
            Check::RequiredShape(Shape::EmailLowerDomain),
            "Please enter a valid email address.",
        ),
        Rule::new(
            Target::Field("resume_attachment"),
            Check::FileSelected,
            "Please upload a resume before submitting.",
        ),
    ],
    allow_list: &[
        "applicant_name",
        "email_id",
        "phone_number",
        "min_experience",
        "min_education_qual",
        "job_title",
        "location",
    ],
    flags: &[],
    slots: &[SlotSpec {
        field: "resume_attachment",
        shape: SlotShape::List,
    }],
    confirm_field: None,
    optional_tab: None,
    optional_field: None,
    success_text: "Your Application has been submitted!",
};

/// Host-provided knobs that shape the built form.
#[derive(Clone, Debug)]
pub struct FormOptions {
    pub languages: Vec<String>,
    pub aadhaar_visible: bool,
    pub employer_visible: bool,
}

fn field_kind(kind: InputKind, opts: &FormOptions) -> FieldKind {
    let select = |options: Vec<String>| FieldKind::Select {
        options,
        cursor: 0,
        selected: None,
        offset: 0,
    };
    match kind {
        Text => FieldKind::Text,
        Date => FieldKind::Date,
        TextArea => FieldKind::TextArea { preview_lines: 3 },
        Decimal => FieldKind::Number { is_integer: false },
        Integer => FieldKind::Number { is_integer: true },
        Checkbox => FieldKind::Checkbox,
        Choice(options) => select(options.iter().map(|s| s.to_string()).collect()),
        Languages => select(opts.languages.clone()),
        Level(options) => FieldKind::Radio {
            options: options.iter().map(|s| s.to_string()).collect(),
            selected: None,
        },
        File { multiple } => FieldKind::File { multiple },
    }
}

fn always_required(profile: &Profile, name: &str) -> bool {
    profile.rules.iter().any(|r| {
        matches!(r.target, Target::Field(n) if n == name)
            && matches!(r.when, When::Always | When::FieldVisible(_))
            && matches!(
                r.check,
                Check::Required | Check::RequiredShape(_) | Check::FileSelected
            )
    })
}

/// Lay the profile out as a form. Tables are placed after the flat fields of their tab.
pub fn build_form(profile: &'static Profile, opts: &FormOptions) -> FormState {
    let tabs = profile
        .tabs
        .iter()
        .enumerate()
        .map(|(i, t)| TabInfo {
            title: t.to_string(),
            visible: !(profile.optional_tab == Some(i) && !opts.employer_visible),
        })
        .collect();
    let mut form = FormState::new(profile.title, tabs);
    for tab in 0..profile.tabs.len() {
        for spec in profile.fields.iter().filter(|f| f.tab == tab) {
            let mut f = FormField::new(spec.name, spec.label, spec.tab, field_kind(spec.kind, opts));
            f.group = spec.group.map(str::to_string);
            f.required = always_required(profile, spec.name);
            f.hidden = profile.optional_field == Some(spec.name) && !opts.aadhaar_visible;
            form.push_field(f);
        }
        for table in profile.tables.iter().filter(|t| t.tab == tab) {
            let columns = table
                .columns
                .iter()
                .map(|c| FormField::new(c.name, c.label, table.tab, field_kind(c.kind, opts)))
                .collect();
            form.add_table(
                TableInfo {
                    id: table.id.to_string(),
                    title: table.title.to_string(),
                    tab: table.tab,
                    columns,
                },
                table.initial_rows,
            );
        }
    }
    form
}
