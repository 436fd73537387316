//! # Query Field Declarations
//!
//! A [`QueryField`] describes one expected request parameter: where to look
//! for it, how to convert it and which values are acceptable.
//!
//! ```rust,ignore
//! QueryField::new("limit", ApiDataType::Integer)
//!     .location(Location::Args)
//!     .default(20)
//!     .comment("Page size");
//! ```

use serde_json::Value;

/// Custom converter. Receives the raw value (already trimmed/lowercased when
/// the field asks for it) and returns the converted value or a reason.
pub type ParseFn = fn(&Value) -> Result<Value, String>;

/// Declared data type of a field. Drives value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiDataType {
    String,
    Integer,
    Float,
    Boolean,
    /// `YYYY-MM-DD`
    Date,
    /// `YYYY-MM-DD HH:MM:SS`
    DateTime,
    /// Any JSON value.
    Json,
    List,
}

/// Part of the request a field is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// URL query string.
    Args,
    /// Top-level keys of a JSON object body.
    Json,
    /// `application/x-www-form-urlencoded` body.
    Form,
    /// Query string, then form body.
    Values,
    /// HTTP headers (case-insensitive names).
    Headers,
    Cookies,
}

impl Location {
    /// Human wording used in "missing parameter" messages.
    pub fn friendly(&self) -> &'static str {
        match self {
            Location::Args => "the query string",
            Location::Json => "the JSON body",
            Location::Form => "the post body",
            Location::Values => "the post body or the query string",
            Location::Headers => "the HTTP headers",
            Location::Cookies => "the request's cookies",
        }
    }
}

/// How repeated values are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Keep the first value.
    #[default]
    Store,
    /// Keep every value as a list.
    Append,
}

/// Declaration of a single request parameter.
#[derive(Debug, Clone)]
pub struct QueryField {
    /// Parameter name as sent by the client.
    pub name: String,

    pub field_type: ApiDataType,

    /// Locations searched in order. Defaults to JSON body, then values.
    pub locations: Vec<Location>,

    /// Overrides `field_type` coercion when set.
    pub parse_func: Option<ParseFn>,

    pub required: bool,

    /// Whether an explicit JSON `null` is accepted.
    pub nullable: bool,

    /// Accepted values. Empty means anything goes.
    pub enum_values: Vec<Value>,

    /// Stored when the parameter is absent.
    pub default: Option<Value>,

    pub comment: String,

    /// Strip surrounding whitespace from string values.
    pub trim: bool,

    /// When false, string values (and string enum values) are lowercased.
    pub case_sensitive: bool,

    /// Silently drop values that fail conversion.
    pub ignore: bool,

    pub action: Action,

    /// Extra text placed in front of validation messages.
    pub help: Option<String>,

    /// Key used in the parsed arguments instead of `name`.
    pub dest: Option<String>,

    /// Store absent, non-required parameters (with their default).
    pub store_missing: bool,
}

impl QueryField {
    pub fn new(name: impl Into<String>, field_type: ApiDataType) -> Self {
        Self {
            name: name.into(),
            field_type,
            locations: vec![Location::Json, Location::Values],
            parse_func: None,
            required: false,
            nullable: true,
            enum_values: Vec::new(),
            default: None,
            comment: String::new(),
            trim: false,
            case_sensitive: true,
            ignore: false,
            action: Action::Store,
            help: None,
            dest: None,
            store_missing: true,
        }
    }

    /// Read the field from a single location.
    pub fn location(mut self, location: Location) -> Self {
        self.locations = vec![location];
        self
    }

    /// Read the field from several locations, in order.
    pub fn locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations = locations.into_iter().collect();
        self
    }

    pub fn parse_with(mut self, parse_func: ParseFn) -> Self {
        self.parse_func = Some(parse_func);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn enum_values<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    pub fn case_insensitive(mut self) -> Self {
        self.case_sensitive = false;
        self
    }

    pub fn ignore_errors(mut self) -> Self {
        self.ignore = true;
        self
    }

    pub fn append(mut self) -> Self {
        self.action = Action::Append;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    /// Leave the parameter out of the parsed arguments when absent.
    pub fn skip_missing(mut self) -> Self {
        self.store_missing = false;
        self
    }

    /// Key under which the parsed value is stored.
    pub fn key(&self) -> &str {
        self.dest.as_deref().unwrap_or(&self.name)
    }

    /// Locations joined for error messages, e.g. `the query string or the JSON body`.
    pub fn friendly_locations(&self) -> String {
        self.locations
            .iter()
            .map(Location::friendly)
            .collect::<Vec<_>>()
            .join(" or ")
    }

    /// Prefix a validation reason with the field name and optional help text.
    pub(crate) fn message(&self, reason: &str) -> String {
        match &self.help {
            Some(help) => format!("{}: ({}) {}", self.name, help, reason),
            None => format!("{}: {}", self.name, reason),
        }
    }
}
