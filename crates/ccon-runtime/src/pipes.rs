//! Anonymous pipes carrying the line-delimited handshake protocol.
//!
//! Each pipe end is a linearly-owned [`OwnedFd`]; dropping it closes the
//! end, which is how ownership transfer after `clone` is expressed. The
//! reader consumes exactly one newline-terminated message, one byte at a
//! time, leaving the descriptor positioned at the byte after the newline.

use std::os::fd::{AsRawFd, OwnedFd};

use nix::errno::Errno;
use nix::unistd::{pipe, read, write};

use ccon_common::constants::MAX_LINE;
use ccon_common::error::{CconError, Result};

/// Creates an anonymous pipe, returning `(read_end, write_end)`.
///
/// # Errors
///
/// Returns a resource error if the pipe cannot be created.
pub fn create() -> Result<(OwnedFd, OwnedFd)> {
    pipe().map_err(|err| CconError::Sys {
        op: "pipe",
        source: err.into(),
    })
}

/// Writes one message in a single syscall.
///
/// # Errors
///
/// Returns a resource error on failure or short write.
pub fn write_message(fd: &OwnedFd, message: &str) -> Result<()> {
    let written = write(fd, message.as_bytes()).map_err(|err| CconError::Sys {
        op: "write to peer",
        source: err.into(),
    })?;
    if written != message.len() {
        return Err(CconError::Sys {
            op: "write to peer",
            source: std::io::Error::from(std::io::ErrorKind::WriteZero),
        });
    }
    Ok(())
}

/// Reads one newline-terminated message of at most [`MAX_LINE`] bytes.
///
/// # Errors
///
/// Returns a protocol error on EOF, an over-length line, or non-UTF-8
/// content; read failures other than `EINTR` surface as resource errors.
pub fn read_message(fd: &OwnedFd) -> Result<String> {
    let mut line = Vec::with_capacity(512);
    let mut byte = [0u8; 1];
    loop {
        if line.len() == MAX_LINE {
            return Err(CconError::Protocol {
                message: format!("message exceeds {MAX_LINE} bytes"),
            });
        }
        match read(fd.as_raw_fd(), &mut byte) {
            Ok(0) => {
                return Err(CconError::Protocol {
                    message: "unexpected EOF on handshake pipe".into(),
                })
            }
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(err) => {
                return Err(CconError::Sys {
                    op: "read from peer",
                    source: err.into(),
                })
            }
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    String::from_utf8(line).map_err(|err| CconError::Protocol {
        message: format!("non-UTF-8 handshake message: {err}"),
    })
}

/// Reads one message and requires it to equal `expected`.
///
/// # Errors
///
/// Returns a protocol error naming `peer` and the observed line on any
/// deviation.
pub fn expect_message(fd: &OwnedFd, expected: &str, peer: &str) -> Result<()> {
    let line = read_message(fd)?;
    if line != expected {
        return Err(CconError::Protocol {
            message: format!("unexpected message from {peer}: {:?}", line.trim_end()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccon_common::constants::CONTAINER_SETUP_COMPLETE;

    #[test]
    fn roundtrip_one_message() {
        let (read_end, write_end) = create().expect("pipe");
        write_message(&write_end, CONTAINER_SETUP_COMPLETE).expect("write");
        let line = read_message(&read_end).expect("read");
        assert_eq!(line, CONTAINER_SETUP_COMPLETE);
    }

    #[test]
    fn reader_stops_at_first_newline() {
        let (read_end, write_end) = create().expect("pipe");
        write_message(&write_end, "first\nsecond\n").expect("write");
        assert_eq!(read_message(&read_end).expect("first"), "first\n");
        assert_eq!(read_message(&read_end).expect("second"), "second\n");
    }

    #[test]
    fn eof_is_a_protocol_error() {
        let (read_end, write_end) = create().expect("pipe");
        drop(write_end);
        let result = read_message(&read_end);
        assert!(matches!(result, Err(CconError::Protocol { .. })));
    }

    #[test]
    fn longest_line_is_max_line_bytes() {
        let (read_end, write_end) = create().expect("pipe");
        let mut message = "a".repeat(MAX_LINE - 1);
        message.push('\n');
        write_message(&write_end, &message).expect("write");
        let line = read_message(&read_end).expect("read");
        assert_eq!(line.len(), MAX_LINE);
    }

    #[test]
    fn overlong_line_is_a_protocol_error() {
        let (read_end, write_end) = create().expect("pipe");
        let mut message = "a".repeat(MAX_LINE);
        message.push('\n');
        write_message(&write_end, &message).expect("write");
        let result = read_message(&read_end);
        assert!(matches!(result, Err(CconError::Protocol { .. })));
    }

    #[test]
    fn mismatched_message_names_the_peer() {
        let (read_end, write_end) = create().expect("pipe");
        write_message(&write_end, "something-else\n").expect("write");
        let err = expect_message(&read_end, CONTAINER_SETUP_COMPLETE, "container")
            .expect_err("mismatch should fail");
        let message = format!("{err}");
        assert!(message.contains("container"));
        assert!(message.contains("something-else"));
    }
}
