use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::mem::Ram;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("image of {len} bytes at 0x{addr:06x} does not fit in {ram} bytes of RAM")]
    TooLarge { addr: u32, len: usize, ram: usize },
}

pub fn read_image(path: impl AsRef<Path>) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| ImageError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Copy a raw big-endian program image into `ram` at `addr`.
pub fn place_image(ram: &mut Ram, addr: u32, image: &[u8]) -> Result<(), ImageError> {
    let start = addr as usize;
    let end = start
        .checked_add(image.len())
        .filter(|&end| end <= ram.len())
        .ok_or(ImageError::TooLarge {
            addr,
            len: image.len(),
            ram: ram.len(),
        })?;
    ram.as_mut_slice()[start..end].copy_from_slice(image);
    debug!("loaded {} bytes at 0x{:06x}", image.len(), addr);
    Ok(())
}

pub fn load_image(path: impl AsRef<Path>, ram: &mut Ram, addr: u32) -> Result<usize, ImageError> {
    let image = read_image(path)?;
    place_image(ram, addr, &image)?;
    Ok(image.len())
}

/// Install `opcodes` as the decrypted fetch view of an image placed at
/// `addr`. Fetches outside it keep reading the plain RAM.
pub fn place_decrypted_opcodes(ram: &mut Ram, addr: u32, opcodes: &[u8]) {
    ram.set_decrypted_opcodes_at(addr, opcodes.to_vec());
    debug!("decrypted opcodes: {} bytes at 0x{:06x}", opcodes.len(), addr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::ProgramSpace;

    #[test]
    fn places_bytes_at_load_address() {
        let mut ram = Ram::new(16);
        place_image(&mut ram, 4, &[0x12, 0x34, 0x56]).unwrap();
        assert_eq!(ram.read_word(4), 0x1234);
        assert_eq!(ram.read_byte(6), 0x56);
        assert_eq!(ram.read_byte(3), 0);
    }

    #[test]
    fn rejects_images_past_the_end() {
        let mut ram = Ram::new(8);
        let err = place_image(&mut ram, 6, &[0; 4]).unwrap_err();
        assert!(matches!(err, ImageError::TooLarge { addr: 6, len: 4, ram: 8 }));
        assert!(place_image(&mut ram, u32::MAX, &[0]).is_err());
    }

    #[test]
    fn decrypted_opcodes_start_at_load_address() {
        let mut ram = Ram::new(0x200);
        ram.write_word(0x08, 0x8d07);
        place_image(&mut ram, 0x100, &[0xff, 0xff]).unwrap();
        place_decrypted_opcodes(&mut ram, 0x100, &[0x7a, 0x00]);
        // vectors below the image still fetch from RAM
        assert_eq!(ram.fetch_opcode(0x08), 0x8d07);
        assert_eq!(ram.fetch_opcode(0x100), 0x7a00);
        assert_eq!(ram.read_word(0x100), 0xffff);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_image("/nonexistent/z8000.bin").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/z8000.bin"));
    }
}
