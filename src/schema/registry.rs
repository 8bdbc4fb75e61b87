//! Every resource exposed by the API, in table creation order.

use super::choices::*;
use super::{
    FieldDef as F, FieldDefault, FieldKind, FilterField, KeyKind, LinkDef, Projection, ResourceDef, SearchField,
};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

pub static PERMISSIONS: ResourceDef = ResourceDef {
    app: "core",
    path: "permissions",
    table: "system_permissions",
    key: KeyKind::Serial,
    fields: &[
        F::text("key", 100).unique(),
        F::text("label", 255),
        F::text("module", 100),
    ],
    links: &[],
    filters: &[],
    search: &[],
    projections: &[],
    read_only: true,
};

pub static ROLES: ResourceDef = ResourceDef {
    app: "core",
    path: "roles",
    table: "roles",
    key: KeyKind::Supplied { max: 50 },
    fields: &[
        F::text("name", 100),
        F::long_text("description").optional(),
        F::boolean("is_system"),
    ],
    links: &[LinkDef {
        name: "permissions",
        join_table: "role_permissions",
        owner_column: "role",
        target_column: "permission",
        target: "system_permissions",
    }],
    filters: &[],
    search: &[],
    projections: &[Projection::LinkDetails { name: "permissions_details", link: "permissions" }],
    read_only: false,
};

pub static USERS: ResourceDef = ResourceDef {
    app: "core",
    path: "users",
    table: "users",
    key: KeyKind::Serial,
    fields: &[
        F::text("username", 150).unique(),
        F::email("email").optional(),
        F::text("first_name", 150).optional(),
        F::text("last_name", 150).optional(),
        F::weak("role", "roles"),
        F::url("avatar").max_len(500).optional(),
        F::text("company_name", 255).optional(),
        F::password("password"),
        F::created("date_joined", FieldKind::DateTime),
    ],
    links: &[],
    filters: &[],
    search: &[],
    projections: &[Projection::Detail { name: "role_details", column: "role" }],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

pub static CLIENT_PROFILES: ResourceDef = ResourceDef {
    app: "clients",
    path: "profiles",
    table: "client_profiles",
    key: KeyKind::Serial,
    fields: &[
        F::text("company_name", 255),
        F::text("cnpj", 20).unique(),
        F::text("responsible_name", 255),
        F::text("responsible_phone", 20),
        F::text("owner_phone", 20).optional(),
        F::text("instagram", 100).optional(),
        F::text("address", 255).optional(),
        F::text("city", 100).optional(),
        F::text("state", 2).optional(),
        F::text("zip_code", 10).optional(),
        F::integer("employee_count").default(FieldDefault::Int(0)),
        F::integer("client_count").default(FieldDefault::Int(0)),
        F::boolean("has_mapped_processes"),
        F::boolean("is_reference"),
        F::text("software_accounting", 100).optional(),
        F::text("software_note_capture", 100).optional(),
        F::text("software_file_converter", 100).optional(),
        F::text("software_whatsapp", 100).optional(),
        F::choice("status", ClientStatus::VALUES).default(FieldDefault::Str(ClientStatus::Active.as_str())),
        F::created("joined_at", FieldKind::Date),
    ],
    links: &[],
    filters: &[
        FilterField::same("status"),
        FilterField::same("state"),
        FilterField::same("has_mapped_processes"),
    ],
    search: &[
        SearchField::Column("company_name"),
        SearchField::Column("cnpj"),
        SearchField::Column("responsible_name"),
    ],
    projections: &[],
    read_only: false,
};

// ---------------------------------------------------------------------------
// CRM
// ---------------------------------------------------------------------------

pub static LEADS: ResourceDef = ResourceDef {
    app: "crm",
    path: "leads",
    table: "leads",
    key: KeyKind::Serial,
    fields: &[
        F::text("name", 255),
        F::text("company", 255),
        F::email("email"),
        F::text("phone", 20),
        F::choice("status", LeadStatus::VALUES).default(FieldDefault::Str(LeadStatus::New.as_str())),
        F::created("created_at", FieldKind::DateTime),
    ],
    links: &[],
    filters: &[FilterField::same("status")],
    search: &[SearchField::Column("name"), SearchField::Column("company"), SearchField::Column("email")],
    projections: &[],
    read_only: false,
};

pub static DEALS: ResourceDef = ResourceDef {
    app: "crm",
    path: "deals",
    table: "deals",
    key: KeyKind::Serial,
    fields: &[
        F::text("title", 255),
        F::decimal("value", 12, 2),
        F::choice("stage", DealStage::VALUES).default(FieldDefault::Str(DealStage::Lead.as_str())),
        F::text("product_interest", 255),
        F::text("company", 255),
        F::weak("owner", "users"),
        F::created("created_at", FieldKind::DateTime),
    ],
    links: &[],
    filters: &[FilterField::same("stage"), FilterField::same("owner")],
    search: &[SearchField::Column("title"), SearchField::Column("company")],
    projections: &[
        Projection::Detail { name: "owner_details", column: "owner" },
        Projection::Children { name: "activities", table: "activities", column: "deal" },
    ],
    read_only: false,
};

pub static ACTIVITIES: ResourceDef = ResourceDef {
    app: "crm",
    path: "activities",
    table: "activities",
    key: KeyKind::Serial,
    fields: &[
        F::choice("activity_type", ActivityType::VALUES),
        F::text("title", 255),
        F::long_text("description").optional(),
        F::datetime("date"),
        F::integer("duration_minutes").default(FieldDefault::Int(30)),
        F::cascade("deal", "deals").nullable(),
        F::weak("user", "users").default(FieldDefault::Caller),
        F::choice("status", ActivityStatus::VALUES).default(FieldDefault::Str(ActivityStatus::Pending.as_str())),
        F::boolean("is_google_event"),
    ],
    links: &[],
    filters: &[FilterField::same("status"), FilterField::same("user"), FilterField::same("deal")],
    search: &[],
    projections: &[Projection::Label { name: "user_name", column: "user", field: "username" }],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

pub static PRODUCTS: ResourceDef = ResourceDef {
    app: "products",
    path: "products",
    table: "products",
    key: KeyKind::Serial,
    fields: &[
        F::text("title", 255),
        F::decimal("price", 10, 2),
        F::choice("price_model", PriceModel::VALUES),
        F::long_text("description"),
        F::choice("category", ProductCategory::VALUES),
        F::text("payment_methods", 255),
        F::long_text("onboarding_process").optional(),
        F::long_text("automation_desc").optional(),
    ],
    links: &[],
    filters: &[FilterField::same("category"), FilterField::same("price_model")],
    search: &[SearchField::Column("title"), SearchField::Column("description")],
    projections: &[Projection::Children { name: "workflow_steps", table: "workflow_steps", column: "product" }],
    read_only: false,
};

pub static WORKFLOW_STEPS: ResourceDef = ResourceDef {
    app: "products",
    path: "workflow-steps",
    table: "workflow_steps",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("product", "products"),
        F::text("title", 255),
        F::long_text("description").optional(),
        F::choice("step_type", StepType::VALUES),
        F::integer("relative_days").default(FieldDefault::Int(0)),
        F::integer("duration_hours").default(FieldDefault::Int(1)),
    ],
    links: &[],
    filters: &[FilterField::same("product"), FilterField::same("step_type")],
    search: &[],
    projections: &[],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub static PROJECTS: ResourceDef = ResourceDef {
    app: "projects",
    path: "projects",
    table: "projects",
    key: KeyKind::Serial,
    fields: &[
        F::text("code", 50).unique().nullable(),
        F::text("title", 255),
        F::long_text("description").optional(),
        F::choice("project_type", ProjectType::VALUES),
        F::cascade("client", "client_profiles"),
        F::weak("manager", "users"),
        F::weak("specialist", "users"),
        F::text("interlocutor_name", 255).optional(),
        F::text("interlocutor_contact", 50).optional(),
        F::email("interlocutor_email").optional(),
        F::choice("status", ProjectStatus::VALUES).default(FieldDefault::Str(ProjectStatus::InProgress.as_str())),
        F::choice("sla_status", SlaStatus::VALUES).default(FieldDefault::Str(SlaStatus::Ok.as_str())),
        F::integer("progress").default(FieldDefault::Int(0)),
        F::touched("last_update"),
        F::date("start_date").nullable(),
        F::date("end_date").nullable(),
        F::date("contract_start").nullable(),
        F::date("contract_end").nullable(),
        F::text("delivery_model", 50).optional(),
        F::decimal("financial_value", 10, 2).nullable(),
        F::decimal("hours_sold", 10, 2).default(FieldDefault::Decimal("0.00")),
        F::decimal("hours_spent", 10, 2).default(FieldDefault::Decimal("0.00")),
    ],
    links: &[],
    filters: &[
        FilterField::same("status"),
        FilterField::same("project_type"),
        FilterField::same("client"),
        FilterField::same("manager"),
    ],
    search: &[
        SearchField::Column("title"),
        SearchField::Column("code"),
        SearchField::Related { column: "client", table: "client_profiles", field: "company_name" },
    ],
    projections: &[
        Projection::Detail { name: "client_details", column: "client" },
        Projection::Detail { name: "manager_details", column: "manager" },
        Projection::Detail { name: "specialist_details", column: "specialist" },
        Projection::Children { name: "meetings", table: "project_meetings", column: "project" },
        Projection::Children { name: "documents", table: "project_documents", column: "project" },
        Projection::Children { name: "notes", table: "project_notes", column: "project" },
    ],
    read_only: false,
};

pub static PROJECT_MEETINGS: ResourceDef = ResourceDef {
    app: "projects",
    path: "meetings",
    table: "project_meetings",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("project", "projects"),
        F::text("title", 255),
        F::datetime("date"),
        F::integer("duration_minutes"),
        F::url("link").optional(),
        F::url("recording_link").optional(),
        F::long_text("attendees"),
    ],
    links: &[],
    filters: &[FilterField::same("project")],
    search: &[],
    projections: &[],
    read_only: false,
};

pub static PROJECT_DOCUMENTS: ResourceDef = ResourceDef {
    app: "projects",
    path: "documents",
    table: "project_documents",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("project", "projects"),
        F::text("title", 255),
        F::choice("doc_type", DocType::VALUES),
        F::url("url"),
        F::weak("uploaded_by", "users").default(FieldDefault::Caller),
        F::created("uploaded_at", FieldKind::DateTime),
        F::text("version", 20).default(FieldDefault::Str("1.0")),
    ],
    links: &[],
    filters: &[FilterField::same("project"), FilterField::renamed("type", "doc_type"), FilterField::same("doc_type")],
    search: &[],
    projections: &[Projection::Label { name: "uploaded_by_name", column: "uploaded_by", field: "username" }],
    read_only: false,
};

pub static PROJECT_NOTES: ResourceDef = ResourceDef {
    app: "projects",
    path: "notes",
    table: "project_notes",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("project", "projects"),
        F::long_text("text"),
        F::choice("note_type", NoteType::VALUES),
        F::weak("author", "users").default(FieldDefault::Caller),
        F::created("created_at", FieldKind::DateTime),
    ],
    links: &[],
    filters: &[FilterField::same("project"), FilterField::renamed("type", "note_type"), FilterField::same("note_type")],
    search: &[],
    projections: &[Projection::Label { name: "author_name", column: "author", field: "username" }],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Onboarding
// ---------------------------------------------------------------------------

pub static ONBOARDING_ITEMS: ResourceDef = ResourceDef {
    app: "onboarding",
    path: "items",
    table: "onboarding_items",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("client", "client_profiles"),
        F::weak("product", "products"),
        F::text("product_name", 255).optional(),
        F::choice("stage", OnboardingStage::VALUES).default(FieldDefault::Str(OnboardingStage::PendingKickoff.as_str())),
        F::date("start_date"),
        F::weak("consultant", "users"),
    ],
    links: &[],
    filters: &[FilterField::same("stage"), FilterField::same("consultant"), FilterField::same("client")],
    search: &[],
    projections: &[
        Projection::Children { name: "tasks", table: "onboarding_tasks", column: "onboarding" },
        Projection::Children { name: "notes", table: "onboarding_notes", column: "onboarding" },
        Projection::Detail { name: "client_details", column: "client" },
        Projection::Detail { name: "consultant_details", column: "consultant" },
    ],
    read_only: false,
};

pub static ONBOARDING_TASKS: ResourceDef = ResourceDef {
    app: "onboarding",
    path: "tasks",
    table: "onboarding_tasks",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("onboarding", "onboarding_items"),
        F::text("title", 255),
        F::boolean("completed"),
        F::date("due_date").nullable(),
        F::weak("assigned_to", "users"),
    ],
    links: &[],
    filters: &[FilterField::same("onboarding"), FilterField::same("completed")],
    search: &[],
    projections: &[],
    read_only: false,
};

pub static ONBOARDING_NOTES: ResourceDef = ResourceDef {
    app: "onboarding",
    path: "notes",
    table: "onboarding_notes",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("onboarding", "onboarding_items"),
        F::long_text("text"),
        F::weak("user", "users").default(FieldDefault::Caller),
        F::created("created_at", FieldKind::DateTime),
    ],
    links: &[],
    filters: &[FilterField::same("onboarding")],
    search: &[],
    projections: &[Projection::Label { name: "user_name", column: "user", field: "username" }],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Support
// ---------------------------------------------------------------------------

pub static TICKET_CATEGORIES: ResourceDef = ResourceDef {
    app: "support",
    path: "categories",
    table: "ticket_categories",
    key: KeyKind::Serial,
    fields: &[F::text("name", 100)],
    links: &[],
    filters: &[],
    search: &[],
    projections: &[],
    read_only: false,
};

pub static TICKETS: ResourceDef = ResourceDef {
    app: "support",
    path: "tickets",
    table: "tickets",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("project", "projects"),
        F::text("title", 255),
        F::long_text("description"),
        F::text("ticket_type", 100),
        F::choice("area", TicketArea::VALUES),
        F::choice("priority", TicketPriority::VALUES),
        F::choice("status", TicketStatus::VALUES).default(FieldDefault::Str(TicketStatus::Open.as_str())),
        F::weak("opened_by", "users").default(FieldDefault::Caller),
        F::weak("assigned_to", "users"),
        F::created("created_at", FieldKind::DateTime),
        F::touched("updated_at"),
        F::datetime("sla_deadline").nullable(),
    ],
    links: &[],
    filters: &[
        FilterField::same("status"),
        FilterField::same("priority"),
        FilterField::same("area"),
        FilterField::same("project"),
    ],
    search: &[SearchField::Column("title"), SearchField::Column("description")],
    projections: &[
        Projection::Children { name: "interactions", table: "ticket_interactions", column: "ticket" },
        Projection::Detail { name: "opened_by_details", column: "opened_by" },
        Projection::Detail { name: "assigned_to_details", column: "assigned_to" },
    ],
    read_only: false,
};

pub static TICKET_INTERACTIONS: ResourceDef = ResourceDef {
    app: "support",
    path: "interactions",
    table: "ticket_interactions",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("ticket", "tickets"),
        F::long_text("text"),
        F::weak("sender", "users").default(FieldDefault::Caller),
        F::choice("role", InteractionRole::VALUES),
        F::created("created_at", FieldKind::DateTime),
    ],
    links: &[],
    filters: &[FilterField::same("ticket")],
    search: &[],
    projections: &[Projection::Label { name: "sender_name", column: "sender", field: "username" }],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub static TASKS: ResourceDef = ResourceDef {
    app: "tasks",
    path: "all",
    table: "tasks",
    key: KeyKind::Serial,
    fields: &[
        F::text("title", 255),
        F::long_text("description").optional(),
        F::choice("status", TaskStatus::VALUES).default(FieldDefault::Str(TaskStatus::Pending.as_str())),
        F::date("due_date").nullable(),
        F::weak("assigned_to", "users"),
        F::choice("assignee_type", AssigneeType::VALUES).default(FieldDefault::Str(AssigneeType::Consultant.as_str())),
        F::cascade("project", "projects").nullable(),
        F::boolean("google_synced"),
        F::text("google_task_id", 255).nullable(),
    ],
    links: &[],
    filters: &[
        FilterField::same("status"),
        FilterField::same("assigned_to"),
        FilterField::same("project"),
        FilterField::same("assignee_type"),
    ],
    search: &[SearchField::Column("title"), SearchField::Column("description")],
    projections: &[
        Projection::Children { name: "subtasks", table: "subtasks", column: "task" },
        Projection::Detail { name: "assigned_to_details", column: "assigned_to" },
    ],
    read_only: false,
};

pub static SUBTASKS: ResourceDef = ResourceDef {
    app: "tasks",
    path: "subtasks",
    table: "subtasks",
    key: KeyKind::Serial,
    fields: &[
        F::cascade("task", "tasks"),
        F::text("title", 255),
        F::boolean("completed"),
    ],
    links: &[],
    filters: &[FilterField::same("task")],
    search: &[],
    projections: &[],
    read_only: false,
};

// ---------------------------------------------------------------------------
// Financial
// ---------------------------------------------------------------------------

pub static LEDGER: ResourceDef = ResourceDef {
    app: "financial",
    path: "ledger",
    table: "ledger_entries",
    key: KeyKind::Serial,
    fields: &[
        F::choice("ledger_type", LedgerType::VALUES),
        F::decimal("amount", 12, 2),
        F::text("description", 255),
        F::date("date"),
        F::weak("consultant", "users"),
    ],
    links: &[],
    filters: &[FilterField::same("ledger_type"), FilterField::same("date"), FilterField::same("consultant")],
    search: &[SearchField::Column("description")],
    projections: &[Projection::Label { name: "consultant_name", column: "consultant", field: "username" }],
    read_only: false,
};

/// Referenced tables always come before the tables that reference them.
pub static RESOURCES: &[&ResourceDef] = &[
    &PERMISSIONS,
    &ROLES,
    &USERS,
    &CLIENT_PROFILES,
    &LEADS,
    &DEALS,
    &ACTIVITIES,
    &PRODUCTS,
    &WORKFLOW_STEPS,
    &PROJECTS,
    &PROJECT_MEETINGS,
    &PROJECT_DOCUMENTS,
    &PROJECT_NOTES,
    &ONBOARDING_ITEMS,
    &ONBOARDING_TASKS,
    &ONBOARDING_NOTES,
    &TICKET_CATEGORIES,
    &TICKETS,
    &TICKET_INTERACTIONS,
    &TASKS,
    &SUBTASKS,
    &LEDGER,
];

pub fn find_by_table(table: &str) -> Option<&'static ResourceDef> {
    RESOURCES.iter().copied().find(|def| def.table == table)
}

pub fn find_by_route(app: &str, path: &str) -> Option<&'static ResourceDef> {
    RESOURCES.iter().copied().find(|def| def.app == app && def.path == path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldKind, OnDelete};

    #[test]
    fn references_point_at_earlier_tables() {
        for (position, def) in RESOURCES.iter().enumerate() {
            for field in def.fields {
                if let Some(target) = field.foreign_table() {
                    let target_position = RESOURCES
                        .iter()
                        .position(|d| d.table == target)
                        .unwrap_or_else(|| panic!("{}.{} points at unknown table {}", def.table, field.name, target));
                    assert!(target_position <= position, "{} must follow {}", def.table, target);
                }
            }
        }
    }

    #[test]
    fn user_references_never_cascade() {
        for def in RESOURCES {
            for field in def.fields {
                if let FieldKind::ForeignKey { table: "users", on_delete } = field.kind {
                    assert_eq!(on_delete, OnDelete::SetNull, "{}.{}", def.table, field.name);
                    assert!(field.nullable);
                }
            }
        }
    }

    #[test]
    fn projections_reference_known_columns() {
        for def in RESOURCES {
            for projection in def.projections {
                match projection {
                    Projection::Detail { column, .. } | Projection::Label { column, .. } => {
                        assert!(def.field(column).and_then(|f| f.foreign_table()).is_some(), "{}.{}", def.table, column);
                    }
                    Projection::Children { table, column, .. } => {
                        let child = find_by_table(table).expect("child table");
                        assert_eq!(child.field(column).and_then(|f| f.foreign_table()), Some(def.table));
                    }
                    Projection::LinkDetails { link, .. } => assert!(def.link(link).is_some()),
                }
            }
        }
    }

    #[test]
    fn routes_are_unique() {
        let mut routes: Vec<String> = RESOURCES.iter().map(|d| d.route()).collect();
        routes.sort();
        routes.dedup();
        assert_eq!(routes.len(), RESOURCES.len());
        assert_eq!(find_by_route("tasks", "all").map(|d| d.table), Some("tasks"));
    }

    #[test]
    fn ticket_status_defaults_to_open() {
        let status = TICKETS.field("status").expect("status field");
        assert!(!status.required);
        assert_eq!(status.default.to_value(), Some(serde_json::json!("Aberto")));
    }
}
