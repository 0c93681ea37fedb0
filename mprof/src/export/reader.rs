use mprof_common::REPORT_HEADER_LEN;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::domain::ReportError;

/// One entry of the report's function table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionEntry {
    pub name: String,
    pub address: u64,
}

/// One bucket record as stored in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketRecord {
    pub alloc_objects: u32,
    pub alloc_bytes: u32,
    pub free_objects: u32,
    pub free_bytes: u32,
    pub stack: Vec<u64>,
}

impl BucketRecord {
    /// Bytes still allocated at dump time
    #[must_use]
    pub fn inuse_bytes(&self) -> i64 {
        i64::from(self.alloc_bytes) - i64::from(self.free_bytes)
    }

    /// Objects still allocated at dump time
    #[must_use]
    pub fn inuse_objects(&self) -> i64 {
        i64::from(self.alloc_objects) - i64::from(self.free_objects)
    }
}

/// A parsed dump report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub functions: Vec<FunctionEntry>,
    pub buckets: Vec<BucketRecord>,
}

impl Report {
    /// Parse a complete report buffer
    ///
    /// # Errors
    /// Returns `ReportError::LengthMismatch` if the declared payload length
    /// disagrees with the buffer, or `ReportError::Truncated` if a record
    /// runs past the end
    pub fn parse(data: &[u8]) -> Result<Self, ReportError> {
        let mut cursor = Cursor { data, pos: 0 };
        let declared = cursor.u32()? as usize;
        let actual = data.len() - REPORT_HEADER_LEN;
        if declared != actual {
            return Err(ReportError::LengthMismatch { declared, actual });
        }

        let function_count = cursor.u32()?;
        let mut functions = Vec::new();
        for _ in 0..function_count {
            let name_len = usize::from(cursor.u8()?);
            let name = String::from_utf8_lossy(cursor.take(name_len)?).into_owned();
            let address = cursor.u64()?;
            functions.push(FunctionEntry { name, address });
        }

        let mut buckets = Vec::new();
        while !cursor.at_end() {
            let alloc_objects = cursor.u32()?;
            let alloc_bytes = cursor.u32()?;
            let free_objects = cursor.u32()?;
            let free_bytes = cursor.u32()?;
            let depth = cursor.u32()?;
            let stack = (0..depth).map(|_| cursor.u64()).collect::<Result<Vec<_>, _>>()?;
            buckets.push(BucketRecord { alloc_objects, alloc_bytes, free_objects, free_bytes, stack });
        }

        Ok(Self { functions, buckets })
    }

    /// Read and parse a report file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid report
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let data = std::fs::read(path)?;
        Self::parse(&data)
    }

    /// Address → name lookup over the function table
    #[must_use]
    pub fn function_names(&self) -> HashMap<u64, &str> {
        self.functions.iter().map(|f| (f.address, f.name.as_str())).collect()
    }
}

/// Bounds-checked big-endian reader
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], ReportError> {
        let remaining = self.data.len() - self.pos;
        if remaining < len {
            return Err(ReportError::Truncated { offset: self.pos, needed: len - remaining });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, ReportError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, ReportError> {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(raw))
    }

    fn u64(&mut self) -> Result<u64, ReportError> {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(raw))
    }

    fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(1u32.to_be_bytes());
        body.push(4);
        body.extend(b"main");
        body.extend(0x10u64.to_be_bytes());
        for v in [3u32, 96, 1, 32, 1] {
            body.extend(v.to_be_bytes());
        }
        body.extend(0x10u64.to_be_bytes());

        let mut data = u32::try_from(body.len()).unwrap().to_be_bytes().to_vec();
        data.extend(body);
        data
    }

    #[test]
    fn test_parse_report() {
        let report = Report::parse(&sample_report()).unwrap();
        assert_eq!(report.functions, vec![FunctionEntry { name: "main".to_string(), address: 0x10 }]);
        assert_eq!(report.buckets.len(), 1);
        assert_eq!(report.buckets[0].alloc_objects, 3);
        assert_eq!(report.buckets[0].inuse_bytes(), 64);
        assert_eq!(report.buckets[0].inuse_objects(), 2);
        assert_eq!(report.function_names().get(&0x10), Some(&"main"));
    }

    #[test]
    fn test_length_mismatch() {
        let mut data = sample_report();
        data.push(0);
        assert!(matches!(Report::parse(&data), Err(ReportError::LengthMismatch { .. })));
    }

    #[test]
    fn test_truncated_record() {
        let mut data = sample_report();
        data.truncate(data.len() - 3);
        let declared = u32::try_from(data.len() - 4).unwrap();
        data[..4].copy_from_slice(&declared.to_be_bytes());
        assert!(matches!(Report::parse(&data), Err(ReportError::Truncated { needed: 3, .. })));
    }

    #[test]
    fn test_missing_header() {
        assert!(matches!(Report::parse(&[0, 0]), Err(ReportError::Truncated { offset: 0, needed: 2 })));
    }

    #[test]
    fn test_serializes_to_json() {
        let report = Report::parse(&sample_report()).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["functions"][0]["name"], "main");
        assert_eq!(json["buckets"][0]["stack"][0], 16);
    }
}
