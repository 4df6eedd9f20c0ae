//! Object-image loading.
//!
//! An image is a flat binary: one big-endian word naming the load origin,
//! then big-endian payload words placed contiguously from that origin.

use std::fs;
use std::path::Path;

use miette::Result;

use crate::bits::swap16;
use crate::error;
use crate::memory::{Memory, MEMORY_MAX};

/// Load one image file into memory. Returns the origin on success.
///
/// Later images overwrite earlier ones where they overlap.
pub fn load_image(path: &Path, mem: &mut Memory) -> Result<u16> {
    let bytes = fs::read(path).map_err(|err| error::image_open(path, &err))?;
    load_bytes(&bytes, mem).ok_or_else(|| error::image_no_origin(path))
}

/// Place an in-memory image. `None` if the image is too short to hold an
/// origin word. Payload past 0xFFFF is silently dropped, as is a trailing
/// odd byte.
pub fn load_bytes(bytes: &[u8], mem: &mut Memory) -> Option<u16> {
    let mut words = bytes
        .chunks_exact(2)
        // words are big-endian on disk, host-endian in memory
        .map(|pair| swap16(u16::from_ne_bytes([pair[0], pair[1]])));

    let origin = words.next()?;
    let mut addr = usize::from(origin);
    for word in words {
        if addr >= MEMORY_MAX {
            break;
        }
        mem.write(addr as u16, word);
        addr += 1;
    }
    Some(origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::scripted::ScriptedKeyboard;

    fn image(words: &[u16]) -> Vec<u8> {
        words.iter().flat_map(|word| word.to_be_bytes()).collect()
    }

    #[test]
    fn loads_payload_at_origin() {
        let mut mem = Memory::new(ScriptedKeyboard::empty());
        let origin = load_bytes(&image(&[0x3000, 0x1234, 0x5678]), &mut mem).unwrap();
        assert_eq!(origin, 0x3000);
        assert_eq!(mem.peek(0x3000), 0x1234);
        assert_eq!(mem.peek(0x3001), 0x5678);
        assert_eq!(mem.peek(0x3002), 0);
    }

    #[test]
    fn truncates_at_end_of_memory() {
        let mut mem = Memory::new(ScriptedKeyboard::empty());
        load_bytes(&image(&[0xFFFE, 0xAAAA, 0xBBBB, 0xCCCC]), &mut mem).unwrap();
        assert_eq!(mem.peek(0xFFFE), 0xAAAA);
        assert_eq!(mem.peek(0xFFFF), 0xBBBB);
        // the third word would land past 0xFFFF and is dropped
        assert_eq!(mem.peek(0x0000), 0);
    }

    #[test]
    fn later_images_overwrite_earlier_ones() {
        let mut mem = Memory::new(ScriptedKeyboard::empty());
        load_bytes(&image(&[0x3000, 0x1111, 0x2222]), &mut mem).unwrap();
        load_bytes(&image(&[0x3001, 0x3333]), &mut mem).unwrap();
        assert_eq!(mem.peek(0x3000), 0x1111);
        assert_eq!(mem.peek(0x3001), 0x3333);
    }

    #[test]
    fn origin_only_image_is_valid() {
        let mut mem = Memory::new(ScriptedKeyboard::empty());
        assert_eq!(load_bytes(&image(&[0x4000]), &mut mem), Some(0x4000));
    }

    #[test]
    fn empty_image_is_rejected() {
        let mut mem = Memory::new(ScriptedKeyboard::empty());
        assert_eq!(load_bytes(&[], &mut mem), None);
        assert_eq!(load_bytes(&[0x30], &mut mem), None);
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut mem = Memory::new(ScriptedKeyboard::empty());
        assert!(load_image(Path::new("/nonexistent/image.obj"), &mut mem).is_err());
    }
}
