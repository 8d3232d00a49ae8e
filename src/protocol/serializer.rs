// RESP Protocol Serializer

use super::{RespValue, Result};
use bytes::{BufMut, BytesMut};

pub struct RespSerializer;

impl RespSerializer {
    /// Serialize a RESP value to bytes
    pub fn serialize(value: &RespValue) -> Vec<u8> {
        let mut buf = BytesMut::new();
        Self::write_value(&mut buf, value);
        buf.to_vec()
    }

    /// Write RESP value to buffer
    fn write_value(buf: &mut BytesMut, value: &RespValue) {
        match value {
            RespValue::SimpleString(s) => {
                buf.put_u8(b'+');
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Error(e) => {
                buf.put_u8(b'-');
                buf.put_slice(e.as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::Integer(i) => {
                buf.put_u8(b':');
                buf.put_slice(i.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
            RespValue::BulkString(opt) => match opt {
                None => {
                    buf.put_slice(b"$-1\r\n");
                }
                Some(data) => {
                    buf.put_u8(b'$');
                    buf.put_slice(data.len().to_string().as_bytes());
                    buf.put_slice(b"\r\n");
                    buf.put_slice(data);
                    buf.put_slice(b"\r\n");
                }
            },
            RespValue::Array(opt) => match opt {
                None => {
                    buf.put_slice(b"*-1\r\n");
                }
                Some(arr) => {
                    buf.put_u8(b'*');
                    buf.put_slice(arr.len().to_string().as_bytes());
                    buf.put_slice(b"\r\n");
                    for item in arr {
                        Self::write_value(buf, item);
                    }
                }
            },
            RespValue::Null => {
                buf.put_slice(b"_\r\n");
            }
            RespValue::Boolean(b) => {
                buf.put_u8(b'#');
                buf.put_u8(if *b { b't' } else { b'f' });
                buf.put_slice(b"\r\n");
            }
            RespValue::Double(d) => {
                buf.put_u8(b',');
                buf.put_slice(d.to_string().as_bytes());
                buf.put_slice(b"\r\n");
            }
        }
    }

    /// Convenience method to create OK response
    pub fn ok() -> Vec<u8> {
        Self::serialize(&RespValue::SimpleString("OK".to_string()))
    }

    /// Convenience method to create error response
    pub fn error(msg: &str) -> Vec<u8> {
        Self::serialize(&RespValue::Error(msg.to_string()))
    }

    /// Convenience method to create null bulk string
    pub fn null_bulk_string() -> Vec<u8> {
        Self::serialize(&RespValue::BulkString(None))
    }

    /// Convenience method to create null array
    pub fn null_array() -> Vec<u8> {
        Self::serialize(&RespValue::Array(None))
    }

    /// Convenience method to create bulk string from bytes
    pub fn bulk_string(data: &[u8]) -> Vec<u8> {
        Self::serialize(&RespValue::BulkString(Some(data.to_vec())))
    }

    /// Convenience method to create integer response
    pub fn integer(i: i64) -> Vec<u8> {
        Self::serialize(&RespValue::Integer(i))
    }

    /// Convenience method to create array response
    pub fn array(items: Vec<RespValue>) -> Vec<u8> {
        Self::serialize(&RespValue::Array(Some(items)))
    }
}
