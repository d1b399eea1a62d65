// AMF0 value

use byteorder::{BigEndian, ByteOrder};
use std::fmt;

use super::{AMFDecodingCursor, AmfObject};

const AMF0_TYPE_NUMBER: u8 = 0x00;
const AMF0_TYPE_BOOL: u8 = 0x01;
const AMF0_TYPE_STRING: u8 = 0x02;
const AMF0_TYPE_OBJECT: u8 = 0x03;
const AMF0_TYPE_NULL: u8 = 0x05;
const AMF0_TYPE_UNDEFINED: u8 = 0x06;
const AMF0_TYPE_ECMA_ARRAY: u8 = 0x08;
const AMF0_TYPE_OBJECT_END: u8 = 0x09;
const AMF0_TYPE_STRICT_ARRAY: u8 = 0x0A;
const AMF0_TYPE_DATE: u8 = 0x0B;

const AMF0_OBJECT_TERM_CODE: u8 = AMF0_TYPE_OBJECT_END;

/// Error raised while decoding an AMF0 value
#[derive(Debug, Clone, PartialEq)]
pub enum AmfError {
    /// The marker byte did not match any known AMF0 type
    InvalidMarker(u8),

    /// The buffer ended before the value was fully decoded
    ShortRead,
}

impl fmt::Display for AmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfError::InvalidMarker(m) => write!(f, "unrecognized AMF0 marker 0x{m:02x}"),
            AmfError::ShortRead => write!(f, "AMF0 buffer ended before value was fully read"),
        }
    }
}

impl std::error::Error for AmfError {}

impl From<()> for AmfError {
    fn from(_: ()) -> Self {
        AmfError::ShortRead
    }
}

/// AMF0 compatible value
#[derive(Clone, Debug, PartialEq)]
pub enum AMF0Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Object(AmfObject),
    Null,
    Undefined,
    EcmaArray { properties: AmfObject, count: u32 },
    StrictArray(Vec<AMF0Value>),
    Date { timestamp: f64, timezone: i16 },
}

impl AMF0Value {
    /// Convenience constructor for an object value
    pub fn object(properties: AmfObject) -> AMF0Value {
        AMF0Value::Object(properties)
    }

    /// Obtains a string representation of the value, for debug logging
    pub fn to_debug_string(&self, tabs: &str) -> String {
        match self {
            AMF0Value::Number(v) => format!("{v}"),
            AMF0Value::Boolean(v) => if *v { "TRUE".to_string() } else { "FALSE".to_string() },
            AMF0Value::String(v) => format!("'{v}'"),
            AMF0Value::Object(props) => Self::debug_props("{", "}", props, tabs),
            AMF0Value::Null => "NULL".to_string(),
            AMF0Value::Undefined => "UNDEFINED".to_string(),
            AMF0Value::EcmaArray { properties, .. } => Self::debug_props("ARRAY {", "}", properties, tabs),
            AMF0Value::StrictArray(items) => {
                let mut res = "STRICT_ARRAY [\n".to_string();
                for value in items {
                    res.push_str(tabs);
                    res.push_str("    ");
                    res.push_str(&value.to_debug_string(&format!("{tabs}    ")));
                    res.push('\n');
                }
                res.push_str(tabs);
                res.push(']');
                res
            }
            AMF0Value::Date { timestamp, .. } => format!("DATE({timestamp})"),
        }
    }

    fn debug_props(open: &str, close: &str, props: &AmfObject, tabs: &str) -> String {
        let mut res = format!("{open}\n");
        for (key, value) in props.iter() {
            res.push_str(tabs);
            res.push_str("    '");
            res.push_str(key);
            res.push_str("' = ");
            res.push_str(&value.to_debug_string(&format!("{tabs}    ")));
            res.push('\n');
        }
        res.push_str(tabs);
        res.push_str(close);
        res
    }

    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, AMF0Value::Null)
    }

    /// Returns true if the value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, AMF0Value::Undefined)
    }

    /// Returns the value as a bool, with lenient coercion
    pub fn get_bool(&self) -> bool {
        match self {
            AMF0Value::Boolean(v) => *v,
            AMF0Value::Number(v) => *v != 0.0,
            _ => false,
        }
    }

    /// Returns the value as an integer, with lenient coercion
    pub fn get_integer(&self) -> i64 {
        match self {
            AMF0Value::Number(v) => *v as i64,
            AMF0Value::Date { timestamp, .. } => *timestamp as i64,
            _ => 0,
        }
    }

    /// Returns the value as a float, with lenient coercion
    pub fn get_float(&self) -> f64 {
        match self {
            AMF0Value::Number(v) => *v,
            AMF0Value::Date { timestamp, .. } => *timestamp,
            _ => 0.0,
        }
    }

    /// Returns the value as a string slice, or "" if not a string-like value
    pub fn get_string(&self) -> &str {
        match self {
            AMF0Value::String(v) => v.as_str(),
            _ => "",
        }
    }

    /// Returns the value as an object property map, for Object/EcmaArray
    pub fn get_object(&self) -> Option<&AmfObject> {
        match self {
            AMF0Value::Object(props) => Some(props),
            AMF0Value::EcmaArray { properties, .. } => Some(properties),
            _ => None,
        }
    }

    /// Gets a property of an object/array value
    pub fn get_object_property(&self, name: &str) -> Option<&AMF0Value> {
        self.get_object().and_then(|o| o.get(name))
    }

    // Encoding

    /// Encodes the value into bytes
    pub fn encode(&self) -> Vec<u8> {
        match self {
            AMF0Value::Number(v) => {
                let mut buf = vec![AMF0_TYPE_NUMBER];
                buf.extend(Self::encode_number(*v));
                buf
            }
            AMF0Value::Boolean(v) => {
                let mut buf = vec![AMF0_TYPE_BOOL];
                buf.push(if *v { 1 } else { 0 });
                buf
            }
            AMF0Value::String(v) => {
                let mut buf = vec![AMF0_TYPE_STRING];
                buf.extend(Self::encode_string(v));
                buf
            }
            AMF0Value::Object(props) => {
                let mut buf = vec![AMF0_TYPE_OBJECT];
                buf.extend(Self::encode_properties(props));
                buf
            }
            AMF0Value::Null => vec![AMF0_TYPE_NULL],
            AMF0Value::Undefined => vec![AMF0_TYPE_UNDEFINED],
            AMF0Value::EcmaArray { properties, count } => {
                let mut buf = vec![AMF0_TYPE_ECMA_ARRAY];
                let mut count_bytes = [0u8; 4];
                BigEndian::write_u32(&mut count_bytes, *count);
                buf.extend(count_bytes);
                buf.extend(Self::encode_properties(properties));
                buf
            }
            AMF0Value::StrictArray(items) => {
                let mut buf = vec![AMF0_TYPE_STRICT_ARRAY];
                let mut count_bytes = [0u8; 4];
                BigEndian::write_u32(&mut count_bytes, items.len() as u32);
                buf.extend(count_bytes);
                for item in items {
                    buf.extend(item.encode());
                }
                buf
            }
            AMF0Value::Date { timestamp, timezone } => {
                let mut buf = vec![AMF0_TYPE_DATE];
                buf.extend(Self::encode_number(*timestamp));
                let mut tz_bytes = [0u8; 2];
                BigEndian::write_i16(&mut tz_bytes, *timezone);
                buf.extend(tz_bytes);
                buf
            }
        }
    }

    fn encode_number(num: f64) -> [u8; 8] {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, num);
        buf
    }

    fn encode_string(s: &str) -> Vec<u8> {
        let str_bytes = s.as_bytes();
        let mut buf = vec![0u8; 2];
        BigEndian::write_u16(&mut buf, str_bytes.len() as u16);
        buf.extend(str_bytes);
        buf
    }

    /// Encodes an object/array property sequence, in insertion order,
    /// terminated by the empty-key + object-end sentinel.
    fn encode_properties(props: &AmfObject) -> Vec<u8> {
        let mut buf = Vec::new();

        for (key, value) in props.iter() {
            buf.extend(Self::encode_string(key));
            buf.extend(value.encode());
        }

        buf.extend(Self::encode_string(""));
        buf.push(AMF0_OBJECT_TERM_CODE);

        buf
    }

    // Decoding

    /// Decodes a single AMF0 value from `buffer`, starting at the cursor's
    /// current position
    pub fn read(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<AMF0Value, AmfError> {
        let marker = cursor.read(buffer, 1).map_err(|_| AmfError::ShortRead)?[0];

        match marker {
            AMF0_TYPE_NUMBER => {
                let b = cursor.read(buffer, 8).map_err(|_| AmfError::ShortRead)?;
                Ok(AMF0Value::Number(BigEndian::read_f64(b)))
            }
            AMF0_TYPE_BOOL => {
                let b = cursor.read(buffer, 1).map_err(|_| AmfError::ShortRead)?;
                Ok(AMF0Value::Boolean(b[0] != 0))
            }
            AMF0_TYPE_STRING => Ok(AMF0Value::String(Self::read_string(cursor, buffer)?)),
            AMF0_TYPE_OBJECT => Ok(AMF0Value::Object(Self::read_properties(cursor, buffer)?)),
            AMF0_TYPE_NULL => Ok(AMF0Value::Null),
            AMF0_TYPE_UNDEFINED => Ok(AMF0Value::Undefined),
            AMF0_TYPE_ECMA_ARRAY => {
                let b = cursor.read(buffer, 4).map_err(|_| AmfError::ShortRead)?;
                let count = BigEndian::read_u32(b);
                let properties = Self::read_properties(cursor, buffer)?;
                Ok(AMF0Value::EcmaArray { properties, count })
            }
            AMF0_TYPE_STRICT_ARRAY => {
                let b = cursor.read(buffer, 4).map_err(|_| AmfError::ShortRead)?;
                let count = BigEndian::read_u32(b) as usize;
                let mut items = Vec::with_capacity(count.min(1 << 16));
                for _ in 0..count {
                    items.push(AMF0Value::read(cursor, buffer)?);
                }
                Ok(AMF0Value::StrictArray(items))
            }
            AMF0_TYPE_DATE => {
                let b = cursor.read(buffer, 8).map_err(|_| AmfError::ShortRead)?;
                let timestamp = BigEndian::read_f64(b);
                let tz_bytes = cursor.read(buffer, 2).map_err(|_| AmfError::ShortRead)?;
                let timezone = BigEndian::read_i16(tz_bytes);
                Ok(AMF0Value::Date { timestamp, timezone })
            }
            other => Err(AmfError::InvalidMarker(other)),
        }
    }

    /// Decodes a standalone value from the start of a byte slice
    pub fn decode_any(buffer: &[u8]) -> Result<AMF0Value, AmfError> {
        let mut cursor = AMFDecodingCursor::new(buffer);
        Self::read(&mut cursor, buffer)
    }

    fn read_string(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<String, AmfError> {
        let len_bytes = cursor.read(buffer, 2).map_err(|_| AmfError::ShortRead)?;
        let len = BigEndian::read_u16(len_bytes) as usize;
        let str_bytes = cursor.read(buffer, len).map_err(|_| AmfError::ShortRead)?;
        Ok(String::from_utf8_lossy(str_bytes).into_owned())
    }

    fn read_properties(cursor: &mut AMFDecodingCursor, buffer: &[u8]) -> Result<AmfObject, AmfError> {
        let mut props = AmfObject::new();

        loop {
            // Peek for the 3-byte object-end sentinel (empty key + 0x09)
            if let Ok(peek) = cursor.look(buffer, 3) {
                if peek[0] == 0 && peek[1] == 0 && peek[2] == AMF0_TYPE_OBJECT_END {
                    cursor.skip(3).map_err(|_| AmfError::ShortRead)?;
                    break;
                }
            }

            let key = Self::read_string(cursor, buffer)?;
            let value = AMF0Value::read(cursor, buffer)?;
            props.set(key, value);

            if cursor.ended() {
                break;
            }
        }

        Ok(props)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives() {
        for v in [
            AMF0Value::Number(42.5),
            AMF0Value::Boolean(true),
            AMF0Value::Boolean(false),
            AMF0Value::String("hello world".to_string()),
            AMF0Value::Null,
            AMF0Value::Undefined,
            AMF0Value::Date { timestamp: 12345.0, timezone: 0 },
        ] {
            let encoded = v.encode();
            let decoded = AMF0Value::decode_any(&encoded).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn round_trips_object_preserving_property_order() {
        let mut obj = AmfObject::new();
        obj.set("app", AMF0Value::String("live".to_string()));
        obj.set("tcUrl", AMF0Value::String("rtmp://x/live".to_string()));
        obj.set("objectEncoding", AMF0Value::Number(0.0));

        let value = AMF0Value::Object(obj.clone());
        let encoded = value.encode();
        let decoded = AMF0Value::decode_any(&encoded).unwrap();

        assert_eq!(decoded, value);

        if let AMF0Value::Object(decoded_obj) = decoded {
            let keys: Vec<&str> = decoded_obj.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, vec!["app", "tcUrl", "objectEncoding"]);
        } else {
            panic!("expected object");
        }
    }

    #[test]
    fn resetting_a_key_moves_it_to_the_end() {
        let mut obj = AmfObject::new();
        obj.set("a", AMF0Value::Number(1.0));
        obj.set("b", AMF0Value::Number(2.0));
        obj.set("a", AMF0Value::Number(3.0));

        let keys: Vec<&str> = obj.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.get("a"), Some(&AMF0Value::Number(3.0)));
    }

    #[test]
    fn round_trips_strict_array() {
        let value = AMF0Value::StrictArray(vec![
            AMF0Value::Number(1.0),
            AMF0Value::String("x".to_string()),
            AMF0Value::Boolean(true),
        ]);
        let encoded = value.encode();
        let decoded = AMF0Value::decode_any(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn round_trips_ecma_array_count_is_informational() {
        let mut props = AmfObject::new();
        props.set("0", AMF0Value::String("first".to_string()));
        props.set("1", AMF0Value::String("second".to_string()));

        let value = AMF0Value::EcmaArray { properties: props, count: 2 };
        let encoded = value.encode();
        let decoded = AMF0Value::decode_any(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn invalid_marker_is_rejected() {
        let err = AMF0Value::decode_any(&[0xff]).unwrap_err();
        assert_eq!(err, AmfError::InvalidMarker(0xff));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let err = AMF0Value::decode_any(&[AMF0_TYPE_NUMBER, 0, 0]).unwrap_err();
        assert_eq!(err, AmfError::ShortRead);
    }
}
