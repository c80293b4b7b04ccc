//! File fingerprints and string checksums built on MurmurHash3, djb2 and SHA-2.

use super::murmur3::{
    self, Murmur3x64_128, Murmur3x86_128, Murmur3x86_32, murmur3_x64_128, murmur3_x86_32,
};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::str::FromStr;

/// Window used when streaming file contents through a hasher.
pub const HASH_WINDOW: usize = 1024 * 1024;

const SHA_FILE_CHUNK: usize = 2048;

/// 128-bit content hash of a file, used as a duplicate-detection key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u128);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&murmur3::x64_128_hex(self.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MurmurVariant {
    X86_32,
    X86_128,
    #[default]
    X64_128,
}

impl MurmurVariant {
    /// Renders a digest produced by this variant, `h1` first.
    pub fn to_hex(self, digest: u128) -> String {
        match self {
            MurmurVariant::X86_32 => format!("{:08x}", digest as u32),
            MurmurVariant::X86_128 => murmur3::x86_128_hex(digest),
            MurmurVariant::X64_128 => murmur3::x64_128_hex(digest),
        }
    }
}

impl FromStr for MurmurVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x86_32" | "32" => Ok(MurmurVariant::X86_32),
            "x86_128" => Ok(MurmurVariant::X86_128),
            "x64_128" | "128" => Ok(MurmurVariant::X64_128),
            other => Err(format!("unknown murmur variant '{other}'")),
        }
    }
}

/// What a string key hashed by [`hash_content_key`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashContentType {
    DirectoryPath,
    MimeType,
}

enum StreamHasher {
    X86_32(Murmur3x86_32),
    X86_128(Murmur3x86_128),
    X64_128(Murmur3x64_128),
}

impl StreamHasher {
    fn new(variant: MurmurVariant) -> Self {
        match variant {
            MurmurVariant::X86_32 => StreamHasher::X86_32(Murmur3x86_32::new(0)),
            MurmurVariant::X86_128 => StreamHasher::X86_128(Murmur3x86_128::new(0)),
            MurmurVariant::X64_128 => StreamHasher::X64_128(Murmur3x64_128::new(0)),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            StreamHasher::X86_32(h) => h.update(data),
            StreamHasher::X86_128(h) => h.update(data),
            StreamHasher::X64_128(h) => h.update(data),
        }
    }

    fn finish(self) -> u128 {
        match self {
            StreamHasher::X86_32(h) => u128::from(h.finish()),
            StreamHasher::X86_128(h) => h.finish(),
            StreamHasher::X64_128(h) => h.finish(),
        }
    }
}

/// Streams `reader` through the chosen MurmurHash3 variant (seed 0) in 1 MiB windows.
pub fn hash_reader<R: Read>(mut reader: R, variant: MurmurVariant) -> io::Result<u128> {
    let mut hasher = StreamHasher::new(variant);
    let mut window = vec![0u8; HASH_WINDOW];
    loop {
        let read = match reader.read(&mut window) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&window[..read]);
    }
    Ok(hasher.finish())
}

/// Opens, hashes and closes the file at `path`.
pub fn hash_file(path: &Path, variant: MurmurVariant) -> io::Result<u128> {
    let file = File::open(path)?;
    hash_reader(file, variant)
}

/// Computes the x64_128 fingerprint of an already opened file.
///
/// The handle stays open and is rewound to the start afterwards so the caller can
/// keep reading it.
pub fn fingerprint_file(file: &mut File) -> io::Result<Fingerprint> {
    file.seek(SeekFrom::Start(0))?;
    let digest = hash_reader(&mut *file, MurmurVariant::X64_128)?;
    file.seek(SeekFrom::Start(0))?;
    Ok(Fingerprint(digest))
}

/// Fast set key for directory paths and MIME names.
pub fn hash_content_key(text: &str, kind: HashContentType) -> String {
    match kind {
        HashContentType::DirectoryPath => {
            murmur3::x64_128_hex(murmur3_x64_128(text.as_bytes(), 0))
        }
        HashContentType::MimeType => format!("{:08x}", murmur3_x86_32(text.as_bytes(), 0)),
    }
}

pub fn murmur_string_hex(text: &str) -> String {
    murmur3::x64_128_hex(murmur3_x64_128(text.as_bytes(), 0))
}

pub fn djb2(text: &str) -> u64 {
    text.bytes().fold(5381u64, |hash, byte| {
        (hash << 5).wrapping_add(hash).wrapping_add(u64::from(byte))
    })
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn sha256_hex(text: &str) -> String {
    hex_lower(&Sha256::digest(text.as_bytes()))
}

pub fn sha512_hex(text: &str) -> String {
    hex_lower(&Sha512::digest(text.as_bytes()))
}

/// SHA-256 of a file's contents, read in 2 KiB chunks.
pub fn file_sha256_hex(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut chunk = [0u8; SHA_FILE_CHUNK];
    loop {
        let read = file.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
    }
    Ok(hex_lower(&hasher.finalize()))
}
