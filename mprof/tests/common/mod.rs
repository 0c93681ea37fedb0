// Shared by several integration test files; not every helper is used by each
#![allow(dead_code)]

use mprof_common::{encode_dump, encode_free, encode_malloc, encode_start, encode_stop, EncodeError};
use std::path::Path;

/// Builder for a framed event stream, as the allocation hook would write it
#[derive(Default)]
pub struct Packets(pub Vec<u8>);

impl Packets {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, encode: impl FnOnce(&mut [u8]) -> Result<usize, EncodeError>) -> Self {
        let mut buf = [0u8; 4096];
        let len = encode(&mut buf).expect("packet fits");
        self.0.extend_from_slice(&buf[..len]);
        self
    }

    pub fn start(self) -> Self {
        self.push(encode_start)
    }

    pub fn stop(self) -> Self {
        self.push(encode_stop)
    }

    pub fn malloc(self, ptr: usize, size: usize, stack: &[usize]) -> Self {
        self.push(|b| encode_malloc(b, ptr, size, stack))
    }

    pub fn free(self, ptr: usize, size: usize) -> Self {
        self.push(|b| encode_free(b, ptr, size))
    }

    pub fn dump(self, path: &Path) -> Self {
        let name = path.to_str().expect("utf-8 temp path").as_bytes().to_vec();
        self.push(move |b| encode_dump(b, &name))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}
