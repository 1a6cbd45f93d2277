//! Parameter coercion.
//!
//! Turns raw request strings into typed, nullable backend arguments.
//! An empty string always becomes SQL NULL of the target type, never the
//! type's zero value; backend functions rely on that distinction.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::dispatch::operations::{Operation, ParamSource, ParamType};
use crate::dispatch::request::GatewayRequest;

/// A typed backend argument; `None` is the null-equivalent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Argument {
    Text(Option<String>),
    Integer(Option<i32>),
    Float(Option<f64>),
    Timestamp(Option<DateTime<Utc>>),
    TextList(Option<Vec<String>>),
    Json(Option<serde_json::Value>),
}

impl Argument {
    /// The null-equivalent argument of type `ty`.
    pub fn null(ty: ParamType) -> Self {
        match ty {
            ParamType::Text => Argument::Text(None),
            ParamType::Integer => Argument::Integer(None),
            ParamType::Float => Argument::Float(None),
            ParamType::Timestamp => Argument::Timestamp(None),
            ParamType::TextList => Argument::TextList(None),
            ParamType::Json => Argument::Json(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Argument::Text(v) => v.is_none(),
            Argument::Integer(v) => v.is_none(),
            Argument::Float(v) => v.is_none(),
            Argument::Timestamp(v) => v.is_none(),
            Argument::TextList(v) => v.is_none(),
            Argument::Json(v) => v.is_none(),
        }
    }
}

/// A supplied value could not be converted to its parameter's type.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid value {value:?} for parameter {parameter}: {reason}")]
pub struct CoercionError {
    pub parameter: &'static str,
    pub value: String,
    pub reason: String,
}

/// Coerce a single raw value into an argument of type `ty`.
pub fn coerce(ty: ParamType, raw: &str) -> Result<Argument, String> {
    if raw.is_empty() {
        return Ok(Argument::null(ty));
    }

    let arg = match ty {
        ParamType::Text => Argument::Text(Some(raw.to_string())),
        ParamType::Integer => Argument::Integer(Some(
            raw.trim().parse::<i32>().map_err(|e| e.to_string())?,
        )),
        ParamType::Float => Argument::Float(Some(
            raw.trim().parse::<f64>().map_err(|e| e.to_string())?,
        )),
        ParamType::Timestamp => Argument::Timestamp(Some(parse_timestamp(raw)?)),
        ParamType::TextList => {
            Argument::TextList(Some(raw.split(',').map(str::to_string).collect()))
        }
        ParamType::Json => Argument::Json(Some(
            serde_json::from_str(raw).map_err(|e| e.to_string())?,
        )),
    };
    Ok(arg)
}

/// Build the ordered argument list for `operation` from `request`.
pub fn prepare(
    operation: &Operation,
    request: &GatewayRequest,
) -> Result<Vec<Argument>, CoercionError> {
    operation
        .params
        .iter()
        .map(|param| match param.source {
            // The path is always present, so it is never nulled.
            ParamSource::Path => Ok(Argument::Text(Some(request.gpath().to_string()))),
            ParamSource::Form(name) => {
                let raw = request.value(name);
                coerce(param.ty, raw).map_err(|reason| CoercionError {
                    parameter: name,
                    value: raw.to_string(),
                    reason,
                })
            }
        })
        .collect()
}

// `%#z` also accepts `Z`, and offsets with or without minutes.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M%#z",
];
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a timestamp; values without an offset are taken as UTC.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    // A trailing zone name of UTC means the same as no offset.
    let raw = raw.strip_suffix(" UTC").map(str::trim_end).unwrap_or(raw);

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(raw, format) {
            return Ok(ts.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| "not a recognised timestamp".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::operations::by_flag;
    use chrono::TimeZone;

    #[test]
    fn test_empty_is_null_for_every_type() {
        for ty in [
            ParamType::Text,
            ParamType::Integer,
            ParamType::Float,
            ParamType::Timestamp,
            ParamType::TextList,
            ParamType::Json,
        ] {
            let arg = coerce(ty, "").unwrap();
            assert!(arg.is_null(), "{:?} should be null", ty);
            assert_eq!(arg, Argument::null(ty));
        }
    }

    #[test]
    fn test_list_split() {
        assert_eq!(
            coerce(ParamType::TextList, "a,b,c").unwrap(),
            Argument::TextList(Some(vec!["a".into(), "b".into(), "c".into()]))
        );
        assert_eq!(
            coerce(ParamType::TextList, "a,,b ").unwrap(),
            Argument::TextList(Some(vec!["a".into(), "".into(), "b ".into()]))
        );
        // Null, not an empty list.
        assert_eq!(coerce(ParamType::TextList, "").unwrap(), Argument::TextList(None));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(coerce(ParamType::Integer, "42").unwrap(), Argument::Integer(Some(42)));
        assert_eq!(coerce(ParamType::Integer, "0").unwrap(), Argument::Integer(Some(0)));
        assert_eq!(coerce(ParamType::Float, "0.5").unwrap(), Argument::Float(Some(0.5)));
        assert!(coerce(ParamType::Integer, "abc").is_err());
        assert!(coerce(ParamType::Integer, "1.5").is_err());
        assert!(coerce(ParamType::Float, "one").is_err());
    }

    #[test]
    fn test_text_is_verbatim() {
        assert_eq!(
            coerce(ParamType::Text, " POINT(1 2) ").unwrap(),
            Argument::Text(Some(" POINT(1 2) ".into()))
        );
    }

    #[test]
    fn test_timestamps() {
        let expected = Utc.with_ymd_and_hms(2017, 3, 1, 12, 30, 0).unwrap();
        for raw in [
            "2017-03-01T12:30:00Z",
            "2017-03-01T22:30:00+10:00",
            "2017-03-01T12:30:00",
            "2017-03-01 12:30:00",
            "2017-03-01 22:30:00+10",
            "2017-03-01T12:30Z",
            "2017-03-01T12:30",
            "2017-03-01 12:30",
            "2017-03-01T14:30+02:00",
            "2017-03-01 12:30:00 UTC",
            "2017-03-01T12:30:00.000Z",
        ] {
            assert_eq!(
                coerce(ParamType::Timestamp, raw).unwrap(),
                Argument::Timestamp(Some(expected)),
                "{}",
                raw
            );
        }

        let midnight = Utc.with_ymd_and_hms(2017, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            coerce(ParamType::Timestamp, "2017-03-01").unwrap(),
            Argument::Timestamp(Some(midnight))
        );
        assert!(coerce(ParamType::Timestamp, "yesterday").is_err());
        assert!(coerce(ParamType::Timestamp, "2017-03-01T12").is_err());
    }

    #[test]
    fn test_json() {
        assert_eq!(
            coerce(ParamType::Json, r#"{"a":[1,2]}"#).unwrap(),
            Argument::Json(Some(serde_json::json!({"a": [1, 2]})))
        );
        assert!(coerce(ParamType::Json, "{not json").is_err());
    }

    #[test]
    fn test_prepare_intersects() {
        let op = by_flag("intersects").unwrap();
        let req = GatewayRequest::new("/ns/a/b?intersects&wkt=POINT(1%202)&srs=4326", None);
        let args = prepare(op, &req).unwrap();

        assert_eq!(args.len(), 11);
        assert_eq!(args[0], Argument::Text(Some("/ns/a/b".into())));
        assert_eq!(args[1], Argument::Text(Some("4326".into())));
        assert_eq!(args[2], Argument::Text(Some("POINT(1 2)".into())));
        assert!(args[3..].iter().all(Argument::is_null));
    }

    #[test]
    fn test_prepare_path_never_null() {
        let op = by_flag("list_sub_gpath").unwrap();
        let req = GatewayRequest::new("/?list_sub_gpath", None);
        assert_eq!(prepare(op, &req).unwrap(), vec![Argument::Text(Some("/".into()))]);
    }

    #[test]
    fn test_prepare_reports_parameter() {
        let op = by_flag("intersects").unwrap();
        let req = GatewayRequest::new("/a?intersects&nseg=many", None);
        let err = prepare(op, &req).unwrap_err();
        assert_eq!(err.parameter, "nseg");
        assert_eq!(err.value, "many");
        assert!(err.to_string().starts_with("invalid value \"many\" for parameter nseg"));
    }

    #[test]
    fn test_serialize_untagged() {
        let args = vec![
            Argument::Text(None),
            Argument::TextList(Some(vec!["a".into()])),
            Argument::Integer(Some(3)),
        ];
        assert_eq!(serde_json::to_string(&args).unwrap(), r#"[null,["a"],3]"#);
    }
}
