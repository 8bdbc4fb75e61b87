//! Static descriptors for every business resource.
//!
//! Each resource is described once by a [`ResourceDef`]: its route, its table,
//! its typed fields, the relations it owns and the read-only projections its
//! representation carries. Validation, storage, DDL and rendering are all
//! driven from these descriptors.

pub mod choices;
pub mod ddl;
pub mod registry;
pub mod value;

use serde::Serialize;
use serde_json::Value;

pub use registry::{find_by_route, find_by_table, RESOURCES};

/// How a resource's identity is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Server-assigned integer sequence
    Serial,
    /// Client-supplied string key (required on create)
    Supplied { max: usize },
}

/// What happens to a referencing row when its target is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
}

impl OnDelete {
    pub fn to_sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::SetNull => "SET NULL",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text; `max` is the character limit, `None` for unbounded text
    Text { max: Option<usize> },
    Email,
    Url { max: usize },
    Integer,
    Decimal { digits: u32, places: u32 },
    Bool,
    Date,
    DateTime,
    Choice(&'static [&'static str]),
    ForeignKey { table: &'static str, on_delete: OnDelete },
    /// Write-only secret, stored as a hash
    Password,
}

impl FieldKind {
    /// Postgres cast used when binding text parameters against this column
    pub fn sql_cast(&self) -> &'static str {
        match self {
            FieldKind::Integer => "bigint",
            FieldKind::Decimal { .. } => "numeric",
            FieldKind::Bool => "boolean",
            FieldKind::Date => "date",
            FieldKind::DateTime => "timestamptz",
            FieldKind::ForeignKey { table, .. } => match registry::find_by_table(table).map(|d| d.key) {
                Some(KeyKind::Supplied { .. }) => "text",
                _ => "bigint",
            },
            _ => "text",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::Text { .. } | FieldKind::Email | FieldKind::Url { .. } | FieldKind::Choice(_) | FieldKind::Password
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FieldDefault {
    None,
    Str(&'static str),
    Int(i64),
    Bool(bool),
    Decimal(&'static str),
    /// The authenticated caller's user id
    Caller,
}

impl FieldDefault {
    /// Static default as JSON; `Caller` is resolved by the pipeline
    pub fn to_value(&self) -> Option<Value> {
        match self {
            FieldDefault::None | FieldDefault::Caller => None,
            FieldDefault::Str(s) => Some(Value::String((*s).to_string())),
            FieldDefault::Int(i) => Some(Value::from(*i)),
            FieldDefault::Bool(b) => Some(Value::Bool(*b)),
            FieldDefault::Decimal(d) => Some(Value::String((*d).to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    /// Server stamps the value once on create
    AutoCreate,
    /// Server stamps the value on every save
    AutoUpdate,
    /// Accepted on input, never rendered
    WriteOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub unique: bool,
    pub default: FieldDefault,
    pub access: Access,
}

impl FieldDef {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            nullable: false,
            unique: false,
            default: FieldDefault::None,
            access: Access::ReadWrite,
        }
    }

    pub const fn text(name: &'static str, max: usize) -> Self {
        Self::new(name, FieldKind::Text { max: Some(max) })
    }

    pub const fn long_text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text { max: None })
    }

    pub const fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email)
    }

    pub const fn url(name: &'static str) -> Self {
        Self::new(name, FieldKind::Url { max: 200 })
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub const fn decimal(name: &'static str, digits: u32, places: u32) -> Self {
        Self::new(name, FieldKind::Decimal { digits, places })
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool).default(FieldDefault::Bool(false))
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub const fn datetime(name: &'static str) -> Self {
        Self::new(name, FieldKind::DateTime)
    }

    pub const fn choice(name: &'static str, values: &'static [&'static str]) -> Self {
        Self::new(name, FieldKind::Choice(values))
    }

    pub const fn cascade(name: &'static str, table: &'static str) -> Self {
        Self::new(name, FieldKind::ForeignKey { table, on_delete: OnDelete::Cascade })
    }

    /// Optional weak reference, cleared when the target is deleted
    pub const fn weak(name: &'static str, table: &'static str) -> Self {
        Self::new(name, FieldKind::ForeignKey { table, on_delete: OnDelete::SetNull }).nullable()
    }

    pub const fn password(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::Password).optional();
        field.access = Access::WriteOnly;
        field
    }

    /// Date or datetime stamped by the server on create
    pub const fn created(name: &'static str, kind: FieldKind) -> Self {
        let mut field = Self::new(name, kind).optional();
        field.access = Access::AutoCreate;
        field
    }

    /// Datetime stamped by the server on every save
    pub const fn touched(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::DateTime).optional();
        field.access = Access::AutoUpdate;
        field
    }

    /// May be omitted or left blank
    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// May be omitted and stored as null
    pub const fn nullable(mut self) -> Self {
        self.required = false;
        self.nullable = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn default(mut self, default: FieldDefault) -> Self {
        self.required = false;
        self.default = default;
        self
    }

    pub const fn max_len(mut self, max: usize) -> Self {
        self.kind = match self.kind {
            FieldKind::Url { .. } => FieldKind::Url { max },
            _ => FieldKind::Text { max: Some(max) },
        };
        self
    }

    /// Client may set this field
    pub fn is_writable(&self) -> bool {
        matches!(self.access, Access::ReadWrite | Access::WriteOnly)
    }

    pub fn is_rendered(&self) -> bool {
        self.access != Access::WriteOnly
    }

    pub fn foreign_table(&self) -> Option<&'static str> {
        match self.kind {
            FieldKind::ForeignKey { table, .. } => Some(table),
            _ => None,
        }
    }
}

/// Many-to-many relation stored in an explicit join table
#[derive(Debug, Clone, Copy)]
pub struct LinkDef {
    /// Field name on the wire, e.g. `permissions`
    pub name: &'static str,
    pub join_table: &'static str,
    pub owner_column: &'static str,
    pub target_column: &'static str,
    pub target: &'static str,
}

/// Query parameter accepted as an equality filter
#[derive(Debug, Clone, Copy)]
pub struct FilterField {
    pub param: &'static str,
    pub column: &'static str,
}

impl FilterField {
    pub const fn same(name: &'static str) -> Self {
        Self { param: name, column: name }
    }

    pub const fn renamed(param: &'static str, column: &'static str) -> Self {
        Self { param, column }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SearchField {
    Column(&'static str),
    /// Matches through a foreign key, e.g. a project's client company name
    Related { column: &'static str, table: &'static str, field: &'static str },
}

/// Read-only data added to a resource's representation
#[derive(Debug, Clone, Copy)]
pub enum Projection {
    /// Full representation of the referenced row
    Detail { name: &'static str, column: &'static str },
    /// Representations of every child row pointing back at this one
    Children { name: &'static str, table: &'static str, column: &'static str },
    /// Single field of the referenced row
    Label { name: &'static str, column: &'static str, field: &'static str },
    /// Representations of every row in a many-to-many link
    LinkDetails { name: &'static str, link: &'static str },
}

#[derive(Debug)]
pub struct ResourceDef {
    pub app: &'static str,
    pub path: &'static str,
    pub table: &'static str,
    pub key: KeyKind,
    pub fields: &'static [FieldDef],
    pub links: &'static [LinkDef],
    pub filters: &'static [FilterField],
    pub search: &'static [SearchField],
    pub projections: &'static [Projection],
    pub read_only: bool,
}

impl ResourceDef {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn link(&self, name: &str) -> Option<&'static LinkDef> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn filter(&self, param: &str) -> Option<&'static FilterField> {
        self.filters.iter().find(|f| f.param == param)
    }

    pub fn route(&self) -> String {
        format!("/api/{}/{}", self.app, self.path)
    }

    /// Postgres cast for a column, including `id`
    pub fn column_cast(&self, column: &str) -> Option<&'static str> {
        if column == "id" {
            return Some(match self.key {
                KeyKind::Serial => "bigint",
                KeyKind::Supplied { .. } => "text",
            });
        }
        self.field(column).map(|f| f.kind.sql_cast())
    }

    /// Foreign keys in other resources that point at this one
    pub fn referencing_fields(&self) -> impl Iterator<Item = (&'static ResourceDef, &'static FieldDef)> + '_ {
        RESOURCES.iter().flat_map(move |def| {
            def.fields
                .iter()
                .filter(move |f| f.foreign_table() == Some(self.table))
                .map(move |f| (*def, f))
        })
    }
}

/// Summary of a resource for the service index
#[derive(Debug, Serialize)]
pub struct ResourceSummary {
    pub route: String,
    pub table: &'static str,
    pub read_only: bool,
}

impl From<&ResourceDef> for ResourceSummary {
    fn from(def: &ResourceDef) -> Self {
        Self { route: format!("{}/", def.route()), table: def.table, read_only: def.read_only }
    }
}
