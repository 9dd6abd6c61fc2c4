use crate::types::errors::MessageLayoutError;
use crate::types::signal::ByteOrder;

/// Verify that (start_bit, size) fits within a frame of `byte_length` bytes.
/// Returns Ok(()) if the signal fits; Err(...) with the reason otherwise.
///
/// DBC assumptions:
/// - Intel: the field occupies bits [start, start + len - 1] on a linear 0..(8*bytes-1) plane.
/// - Motorola: map DBC start_bit (the MSB) to the MSB-first index `lin = (start & !7) + (7 - (start & 7))`,
///   then the field advances towards later bytes: [lin .. lin + len - 1].
pub fn check_signal_fits(
    byte_length: u16,
    start_bit: u16,
    size: u16,
    byte_order: ByteOrder,
) -> Result<(), MessageLayoutError> {
    if size == 0 {
        return Err(MessageLayoutError::ZeroBitLength);
    }
    let total_bits: usize = (byte_length as usize) * 8;

    match byte_order {
        ByteOrder::LittleEndian => {
            let start: usize = start_bit as usize;
            let end: usize = start + (size as usize) - 1;
            if end < total_bits {
                Ok(())
            } else {
                Err(MessageLayoutError::IntelOutOfBounds {
                    end,
                    total_bits,
                    dlc: byte_length,
                })
            }
        }
        ByteOrder::BigEndian => {
            // start=0 -> 7, start=7 -> 0, start=8 -> 15
            let s: usize = start_bit as usize;
            let linearized_start: usize = (s & !7) + (7 - (s & 7));
            let linearized_end: usize = linearized_start + (size as usize) - 1;

            if linearized_start >= total_bits {
                return Err(MessageLayoutError::MotorolaStartOutOfBounds {
                    start: linearized_start,
                    total_bits,
                    dlc: byte_length,
                });
            }
            if linearized_end >= total_bits {
                return Err(MessageLayoutError::MotorolaEndOutOfBounds {
                    end: linearized_end,
                    total_bits,
                    dlc: byte_length,
                });
            }
            Ok(())
        }
    }
}
