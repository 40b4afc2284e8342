use std::io::BufRead;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub desc: Option<String>,
    /// 原始残基（大写 ASCII，已去除空白）
    pub seq: Vec<u8>,
}

impl FastaRecord {
    /// 完整标题行（不含 `>`）
    pub fn title(&self) -> String {
        match &self.desc {
            Some(d) => format!("{} {}", self.id, d),
            None => self.id.clone(),
        }
    }
}

/// 流式 FASTA 读取，核酸与蛋白序列都按原样保留字母
pub struct FastaReader<R: BufRead> {
    reader: R,
    buf: String,
    done: bool,
    peek_header: Option<String>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: String::new(), done: false, peek_header: None }
    }

    pub fn next_record(&mut self) -> Result<Option<FastaRecord>> {
        if self.done {
            return Ok(None);
        }

        let header = match self.peek_header.take() {
            Some(h) => h,
            None => loop {
                self.buf.clear();
                if self.reader.read_line(&mut self.buf)? == 0 {
                    self.done = true;
                    return Ok(None);
                }
                if let Some(h) = self.buf.strip_prefix('>') {
                    break h.trim().to_string();
                }
            },
        };

        let mut parts = header.splitn(2, char::is_whitespace);
        let id = parts.next().unwrap_or("").to_string();
        let desc = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        let mut seq: Vec<u8> = Vec::new();
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                self.done = true;
                break;
            }
            if let Some(h) = self.buf.strip_prefix('>') {
                self.peek_header = Some(h.trim().to_string());
                break;
            }
            // ';' comment lines from old-style files
            if self.buf.starts_with(';') {
                continue;
            }
            seq.extend(self.buf.bytes().filter(|b| !b.is_ascii_whitespace()).map(|b| b.to_ascii_uppercase()));
        }

        Ok(Some(FastaRecord { id, desc, seq }))
    }

    /// 读完剩余的全部记录
    pub fn read_all(mut self) -> Result<Vec<FastaRecord>> {
        let mut out = Vec::new();
        while let Some(rec) = self.next_record()? {
            out.push(rec);
        }
        Ok(out)
    }
}

/// 打开 FASTA 文件并读入全部记录
pub fn read_fasta_file(path: &str) -> Result<Vec<FastaRecord>> {
    let fh = std::fs::File::open(path)?;
    FastaReader::new(std::io::BufReader::new(fh)).read_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_protein_records() {
        let data = b">sp|P1 first protein\nMKvl\nAAG*\n>p2\nWY\n";
        let mut r = FastaReader::new(Cursor::new(&data[..]));

        let r1 = r.next_record().unwrap().unwrap();
        assert_eq!(r1.id, "sp|P1");
        assert_eq!(r1.desc.as_deref(), Some("first protein"));
        assert_eq!(r1.title(), "sp|P1 first protein");
        assert_eq!(r1.seq, b"MKVLAAG*");

        let r2 = r.next_record().unwrap().unwrap();
        assert_eq!(r2.title(), "p2");
        assert_eq!(r2.seq, b"WY");

        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn parse_with_crlf_comments_and_blank_lines() {
        let data = b"\n\n>q1 desc\r\nAC g t n\r\n;comment\r\n acgt\r\n>q2 \r\n N N N \r\n";
        let recs = FastaReader::new(Cursor::new(&data[..])).read_all().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].seq, b"ACGTNACGT");
        assert_eq!(recs[1].id, "q2");
        assert_eq!(recs[1].desc, None);
        assert_eq!(recs[1].seq, b"NNN");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let e = read_fasta_file("/nonexistent/seed_extend.fa").unwrap_err();
        assert!(matches!(e, crate::error::ExtendError::Io(_)));
    }
}
