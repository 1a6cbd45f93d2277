//! Operation table.
//!
//! # Responsibilities
//! - Map each recognised query flag to a backend function
//! - Describe the ordered parameter list and its coercion types
//! - Select the operation for a request by flag presence
//!
//! # Design Decisions
//! - The table is static and ordered; its order is the priority order
//! - When several flags are present, the first entry in table order wins
//! - Flag values are ignored, only presence counts

/// Where a parameter's raw value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    /// The decoded URL path (the gpath).
    Path,
    /// A named form/query value.
    Form(&'static str),
}

/// Target type of a backend argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Text,
    Integer,
    Float,
    Timestamp,
    TextList,
    Json,
}

impl ParamType {
    /// PostgreSQL type the placeholder is cast to.
    pub fn sql_type(&self) -> &'static str {
        match self {
            ParamType::Text => "text",
            ParamType::Integer => "integer",
            ParamType::Float => "float8",
            ParamType::Timestamp => "timestamptz",
            ParamType::TextList => "text[]",
            ParamType::Json => "jsonb",
        }
    }
}

/// A single positional parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub source: ParamSource,
    pub ty: ParamType,
}

impl ParamSpec {
    const fn path() -> Self {
        Self {
            source: ParamSource::Path,
            ty: ParamType::Text,
        }
    }

    const fn form(name: &'static str, ty: ParamType) -> Self {
        Self {
            source: ParamSource::Form(name),
            ty,
        }
    }

    /// Name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self.source {
            ParamSource::Path => "gpath",
            ParamSource::Form(name) => name,
        }
    }
}

/// Descriptor of a backend operation selectable by query flag.
#[derive(Debug, PartialEq, Eq)]
pub struct Operation {
    /// Query-string key whose presence selects this operation.
    pub flag: &'static str,
    /// Backend function invoked.
    pub function: &'static str,
    /// Ordered positional parameters.
    pub params: &'static [ParamSpec],
    /// Whether the backend function writes state (OWS cache entries).
    pub mutates_state: bool,
}

use ParamType::*;

/// All supported operations in priority order.
pub static OPERATIONS: &[Operation] = &[
    Operation {
        flag: "intersects",
        function: "mas_intersects",
        params: &[
            ParamSpec::path(),
            ParamSpec::form("srs", Text),
            ParamSpec::form("wkt", Text),
            ParamSpec::form("nseg", Integer),
            ParamSpec::form("time", Timestamp),
            ParamSpec::form("until", Timestamp),
            ParamSpec::form("namespace", TextList),
            ParamSpec::form("metadata", Text),
            ParamSpec::form("identitytol", Float),
            ParamSpec::form("dptol", Float),
            ParamSpec::form("limit", Integer),
        ],
        mutates_state: false,
    },
    Operation {
        flag: "timestamps",
        function: "mas_timestamps",
        params: &[
            ParamSpec::path(),
            ParamSpec::form("time", Timestamp),
            ParamSpec::form("until", Timestamp),
            ParamSpec::form("namespace", TextList),
            ParamSpec::form("token", Text),
        ],
        mutates_state: false,
    },
    Operation {
        flag: "extents",
        function: "mas_spatial_temporal_extents",
        params: &[ParamSpec::path(), ParamSpec::form("namespace", TextList)],
        mutates_state: false,
    },
    Operation {
        flag: "list_root_gpath",
        function: "mas_list_root_gpath",
        params: &[],
        mutates_state: false,
    },
    Operation {
        flag: "list_sub_gpath",
        function: "mas_list_sub_gpath",
        params: &[ParamSpec::path()],
        mutates_state: false,
    },
    Operation {
        flag: "generate_layers",
        function: "mas_generate_layers",
        params: &[ParamSpec::path()],
        mutates_state: false,
    },
    Operation {
        flag: "put_ows_cache",
        function: "mas_put_ows_cache",
        params: &[
            ParamSpec::path(),
            ParamSpec::form("query", Text),
            ParamSpec::form("value", Json),
        ],
        mutates_state: true,
    },
    Operation {
        flag: "get_ows_cache",
        function: "mas_get_ows_cache",
        params: &[ParamSpec::path(), ParamSpec::form("query", Text)],
        mutates_state: true,
    },
];

/// Message returned when no recognised flag is present.
pub const UNSUPPORTED_MESSAGE: &str =
    "unknown operation; currently supported: ?intersects, ?timestamps, ?extents";

/// Return the first operation, in priority order, whose flag is present.
pub fn find(is_present: impl Fn(&str) -> bool) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| is_present(op.flag))
}

/// Look up an operation by its flag name.
pub fn by_flag(flag: &str) -> Option<&'static Operation> {
    OPERATIONS.iter().find(|op| op.flag == flag)
}
