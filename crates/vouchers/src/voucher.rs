use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use voucherbook_core::{Entity, Sign, TransactionId, VoucherId};

const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Offset-qualified date-times without seconds (`Z`, `+07`, `+07:00`).
const OFFSET_MINUTE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%#z", "%Y-%m-%d %H:%M%#z"];

/// Largest magnitude below which every integer is exactly representable.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Transaction date exactly as stored in the voucher document.
///
/// Documents are not schema-checked, so the value may be an ISO string, epoch
/// milliseconds, an extended-JSON `{"$date": ...}` wrapper, or garbage.
/// Use [`RawDate::timestamp`] to interpret it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawDate(Value);

impl RawDate {
    /// Interpret the stored value as a UTC instant. `None` means missing or invalid.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match &self.0 {
            Value::Object(map) => match map.get("$date")? {
                Value::Object(inner) => inner
                    .get("$numberLong")?
                    .as_str()?
                    .parse::<i64>()
                    .ok()
                    .and_then(DateTime::from_timestamp_millis),
                other => scalar_timestamp(other),
            },
            other => scalar_timestamp(other),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

fn scalar_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Number(n) => match n.as_i64() {
            Some(millis) => DateTime::from_timestamp_millis(millis),
            // Fractional millis truncate toward zero.
            None => n
                .as_f64()
                .filter(|f| f.is_finite())
                .and_then(|f| DateTime::from_timestamp_millis(f.trunc() as i64)),
        },
        _ => None,
    }
}

/// Parse a date string into a UTC instant.
///
/// Accepts RFC 3339 (seconds optional), naive date-times (`T` or space
/// separated, seconds optional, read as UTC) and bare `YYYY-MM-DD` dates
/// (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_MINUTE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<&str> for RawDate {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for RawDate {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<DateTime<Utc>> for RawDate {
    fn from(value: DateTime<Utc>) -> Self {
        Self(Value::String(value.to_rfc3339_opts(SecondsFormat::Millis, true)))
    }
}

impl From<Value> for RawDate {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Free-form transaction details. Only `price` is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetails {
    #[serde(
        default,
        deserialize_with = "deserialize_price",
        serialize_with = "serialize_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.is_finite())
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("price is not a finite number: {n}"))),
        Some(other) => Err(de::Error::custom(format!("price must be numeric, got {other}"))),
    }
}

fn serialize_price<S>(price: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match price {
        Some(amount) => serialize_amount(amount, serializer),
        None => serializer.serialize_none(),
    }
}

/// Writes whole amounts as JSON integers (`15000`, not `15000.0`) and
/// everything else as a float.
pub(crate) fn serialize_amount<S>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if amount.fract() == 0.0 && amount.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*amount as i64)
    } else {
        serializer.serialize_f64(*amount)
    }
}

/// One entry of a voucher's `historyTransaksi`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id")]
    pub id: TransactionId,

    #[serde(default)]
    pub date: Option<RawDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<TransactionDetails>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    pub fn new(id: TransactionId) -> Self {
        Self {
            id,
            date: None,
            details: None,
            extra: Map::new(),
        }
    }

    pub fn dated(mut self, date: impl Into<RawDate>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn priced(mut self, price: f64) -> Self {
        self.details.get_or_insert_with(TransactionDetails::default).price = Some(price);
        self
    }

    /// Price with an absent value counted as zero.
    pub fn price(&self) -> f64 {
        self.details.as_ref().and_then(|d| d.price).unwrap_or(0.0)
    }

    /// Parsed transaction instant, `None` when the date is missing or invalid.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.date.as_ref().and_then(RawDate::timestamp)
    }
}

impl Entity for Transaction {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// A voucher document as returned by the store.
///
/// Fields this crate does not interpret are kept in `extra` and written back
/// out unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voucher {
    #[serde(rename = "_id")]
    pub id: VoucherId,

    pub sign: Sign,

    #[serde(
        rename = "historyTransaksi",
        default,
        deserialize_with = "deserialize_history"
    )]
    pub history: Vec<Transaction>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_history<'de, D>(deserializer: D) -> Result<Vec<Transaction>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Transaction>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Voucher {
    pub fn new(id: VoucherId, sign: Sign) -> Self {
        Self {
            id,
            sign,
            history: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_transaction(mut self, transaction: Transaction) -> Self {
        self.history.push(transaction);
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl Entity for Voucher {
    type Id = VoucherId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
