//! Content hashing: MurmurHash3 variants and file/string checksums.

pub mod checksum;
pub mod murmur3;

pub use checksum::{
    Fingerprint, HashContentType, MurmurVariant, djb2, file_sha256_hex, fingerprint_file,
    hash_content_key, hash_file, hash_reader, murmur_string_hex, sha256_hex, sha512_hex,
};
pub use murmur3::{
    Murmur3x64_128, Murmur3x86_128, Murmur3x86_32, murmur3_x64_128, murmur3_x86_128,
    murmur3_x86_32,
};
