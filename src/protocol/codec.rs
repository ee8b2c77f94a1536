//! Wire encoding and decoding

use super::{Command, ProtocolError, ACK};
use byteorder::{ByteOrder, NativeEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// Width of the length field: one machine word
pub const LENGTH_FIELD_SIZE: usize = std::mem::size_of::<usize>();

/// Read the next command tag.
///
/// Returns `None` when the stream ends cleanly on a command boundary.
pub fn read_tag<R: Read>(reader: &mut R) -> Result<Option<u8>, ProtocolError> {
    let mut tag = [0u8; 1];
    loop {
        match reader.read(&mut tag) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(tag[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Read a length field (host byte order, word sized)
pub fn read_length<R: Read>(reader: &mut R) -> Result<usize, ProtocolError> {
    let mut buf = [0u8; LENGTH_FIELD_SIZE];
    fill(reader, &mut buf, "length field")?;
    // LENGTH_FIELD_SIZE is the width of usize, so this never truncates
    Ok(NativeEndian::read_uint(&buf, LENGTH_FIELD_SIZE) as usize)
}

/// Read exactly `len` payload bytes into `scratch`.
///
/// The buffer only ever grows, so repeated commands of similar size reuse
/// the same allocation. Returns the filled prefix.
pub fn read_payload<'a, R: Read>(
    reader: &mut R,
    len: usize,
    scratch: &'a mut Vec<u8>,
) -> Result<&'a [u8], ProtocolError> {
    if scratch.len() < len {
        scratch.resize(len, 0);
    }
    let payload = &mut scratch[..len];
    fill(reader, payload, "payload")?;
    Ok(payload)
}

/// Encode a full request and flush it
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> io::Result<()> {
    let payload = command.payload();
    writer.write_u8(command.tag() as u8)?;
    writer.write_uint::<NativeEndian>(payload.len() as u64, LENGTH_FIELD_SIZE)?;
    writer.write_all(payload)?;
    writer.flush()
}

/// Write and flush the acknowledgement byte
pub fn write_ack<W: Write>(writer: &mut W) -> io::Result<()> {
    writer.write_u8(ACK)?;
    writer.flush()
}

/// Wait for an acknowledgement.
///
/// End of stream before the byte arrives means the command failed on the
/// other side; it is reported as a truncated acknowledgement.
pub fn read_ack<R: Read>(reader: &mut R) -> Result<(), ProtocolError> {
    let byte = match reader.read_u8() {
        Ok(byte) => byte,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::Truncated {
                field: "acknowledgement",
                expected: 1,
                received: 0,
            })
        }
        Err(e) => return Err(e.into()),
    };

    if byte != ACK {
        return Err(ProtocolError::UnexpectedAck(byte));
    }
    Ok(())
}

/// Like `read_exact`, but reports how far it got when the stream ends
fn fill<R: Read>(reader: &mut R, buf: &mut [u8], field: &'static str) -> Result<(), ProtocolError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(ProtocolError::Truncated {
                    field,
                    expected: buf.len(),
                    received: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StorePath;
    use std::io::Cursor;

    #[test]
    fn test_read_tag_clean_eof() {
        let mut reader = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_tag(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_read_tag() {
        let mut reader = Cursor::new(vec![0x07, 0x00]);
        assert_eq!(read_tag(&mut reader).unwrap(), Some(0x07));
        assert_eq!(read_tag(&mut reader).unwrap(), Some(0x00));
        assert_eq!(read_tag(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_read_length_native_endian() {
        let mut reader = Cursor::new(1234usize.to_ne_bytes().to_vec());
        assert_eq!(read_length(&mut reader).unwrap(), 1234);
    }

    #[test]
    fn test_read_length_truncated() {
        let mut reader = Cursor::new(vec![5u8, 0, 0]);
        match read_length(&mut reader) {
            Err(ProtocolError::Truncated {
                field,
                expected,
                received,
            }) => {
                assert_eq!(field, "length field");
                assert_eq!(expected, LENGTH_FIELD_SIZE);
                assert_eq!(received, 3);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_read_payload_grows_and_reuses() {
        let mut scratch = Vec::new();
        let mut reader = Cursor::new(b"hello world".to_vec());

        let payload = read_payload(&mut reader, 5, &mut scratch).unwrap();
        assert_eq!(payload, b"hello");
        assert_eq!(scratch.len(), 5);

        let payload = read_payload(&mut reader, 6, &mut scratch).unwrap();
        assert_eq!(payload, b" world");
        assert_eq!(scratch.len(), 6);

        // A smaller read never shrinks the buffer
        let mut reader = Cursor::new(b"ab".to_vec());
        let payload = read_payload(&mut reader, 2, &mut scratch).unwrap();
        assert_eq!(payload, b"ab");
        assert_eq!(scratch.len(), 6);
    }

    #[test]
    fn test_read_payload_truncated() {
        let mut scratch = Vec::new();
        let mut reader = Cursor::new(b"abc".to_vec());
        let err = read_payload(&mut reader, 10, &mut scratch).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn test_write_command_layout() {
        let path = StorePath::parse("7rjj86a15146cq1d3qy068lml7n8ykzm-hello").unwrap();
        let mut out = Vec::new();
        write_command(&mut out, &Command::AddTempRoot(path.clone())).unwrap();

        assert_eq!(out[0], 0);
        let len_bytes = &out[1..1 + LENGTH_FIELD_SIZE];
        assert_eq!(len_bytes, &path.as_bytes().len().to_ne_bytes());
        assert_eq!(&out[1 + LENGTH_FIELD_SIZE..], path.as_bytes());
    }

    #[test]
    fn test_ack() {
        let mut out = Vec::new();
        write_ack(&mut out).unwrap();
        assert_eq!(out, vec![ACK]);

        assert!(read_ack(&mut Cursor::new(vec![0u8])).is_ok());
        assert!(matches!(
            read_ack(&mut Cursor::new(vec![9u8])),
            Err(ProtocolError::UnexpectedAck(9))
        ));
        assert!(read_ack(&mut Cursor::new(Vec::<u8>::new()))
            .unwrap_err()
            .is_truncated());
    }
}
