//! Synthetic archive and serialized-file builders for the integration tests.

#![allow(dead_code)]

pub const ENGINE: &str = "2019.4.3f1";

// ── Byte writer ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct Writer {
    pub buf: Vec<u8>,
    big:     bool,
}

impl Writer {
    pub fn le() -> Self { Self { buf: Vec::new(), big: false } }
    pub fn be() -> Self { Self { buf: Vec::new(), big: true } }

    pub fn len(&self) -> usize { self.buf.len() }

    pub fn u8(&mut self, v: u8) -> &mut Self { self.buf.push(v); self }
    pub fn bool(&mut self, v: bool) -> &mut Self { self.u8(v as u8) }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.bytes(&b)
    }
    pub fn i16(&mut self, v: i16) -> &mut Self { self.u16(v as u16) }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.bytes(&b)
    }
    pub fn i32(&mut self, v: i32) -> &mut Self { self.u32(v as u32) }
    pub fn f32(&mut self, v: f32) -> &mut Self { self.u32(v.to_bits()) }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        let b = if self.big { v.to_be_bytes() } else { v.to_le_bytes() };
        self.bytes(&b)
    }
    pub fn i64(&mut self, v: i64) -> &mut Self { self.u64(v as u64) }

    pub fn bytes(&mut self, b: &[u8]) -> &mut Self { self.buf.extend_from_slice(b); self }

    pub fn cstr(&mut self, s: &str) -> &mut Self { self.bytes(s.as_bytes()).u8(0) }

    pub fn align(&mut self, n: usize) -> &mut Self {
        while self.buf.len() % n != 0 {
            self.buf.push(0);
        }
        self
    }

    pub fn aligned_str(&mut self, s: &str) -> &mut Self {
        self.i32(s.len() as i32).bytes(s.as_bytes()).align(4)
    }

    pub fn floats(&mut self, vs: &[f32]) -> &mut Self {
        for v in vs {
            self.f32(*v);
        }
        self
    }

    pub fn pptr(&mut self, file_id: i32, path_id: i64) -> &mut Self { self.i32(file_id).i64(path_id) }

    fn patch_u32_be(&mut self, at: usize, v: u32) {
        self.buf[at..at + 4].copy_from_slice(&v.to_be_bytes());
    }
}

// ── Serialized file ──────────────────────────────────────────────────────────

pub struct ObjectEntry {
    pub path_id:           i64,
    /// Index into the builder's classes.
    pub type_index:        usize,
    pub script_type_index: i16,
    pub data:              Vec<u8>,
}

/// Serialized file with one type per class.  Every format-dependent field of
/// the metadata is emitted, so any format from 5 up can be built.
pub struct SerializedBuilder {
    pub format:             u32,
    pub engine_version:     String,
    pub platform:           i32,
    pub big_endian:         bool,
    /// Emit type trees (always emitted below format 13).
    pub type_trees:         bool,
    /// 64-bit path ids through the formats 7 to 13 flag.
    pub big_ids:            bool,
    pub classes:            Vec<i32>,
    pub objects:            Vec<ObjectEntry>,
    pub script_types:       Vec<(i32, i64)>,
    pub externals:          Vec<String>,
    /// Overrides the written externals count.
    pub declared_externals: Option<i32>,
}

impl SerializedBuilder {
    pub fn new(format: u32) -> Self {
        Self {
            format,
            engine_version:     ENGINE.to_owned(),
            platform:           5,
            big_endian:         false,
            type_trees:         false,
            big_ids:            false,
            classes:            Vec::new(),
            objects:            Vec::new(),
            script_types:       Vec::new(),
            externals:          Vec::new(),
            declared_externals: None,
        }
    }

    pub fn class(mut self, class_id: i32) -> Self {
        self.classes.push(class_id);
        self
    }

    pub fn object(self, path_id: i64, type_index: usize, data: Vec<u8>) -> Self {
        self.script_object(path_id, type_index, -1, data)
    }

    pub fn script_object(mut self, path_id: i64, type_index: usize, script_type_index: i16, data: Vec<u8>) -> Self {
        self.objects.push(ObjectEntry { path_id, type_index, script_type_index, data });
        self
    }

    pub fn script_type(mut self, file_index: i32, path_id: i64) -> Self {
        self.script_types.push((file_index, path_id));
        self
    }

    pub fn external(mut self, path: &str) -> Self {
        self.externals.push(path.to_owned());
        self
    }

    pub fn writer(&self) -> Writer {
        if self.big_endian { Writer::be() } else { Writer::le() }
    }

    pub fn build(&self) -> Vec<u8> {
        let format = self.format;
        let wide = format >= 22;
        let trailing_metadata = format < 9;
        let header_len = if wide { 48 } else if trailing_metadata { 16 } else { 20 };

        // Object starts relative to the data offset, each 8-aligned.
        let mut starts = Vec::new();
        let mut cursor = 0usize;
        for obj in &self.objects {
            cursor = (cursor + 7) & !7;
            starts.push(cursor);
            cursor += obj.data.len();
        }

        let mut w = self.writer();
        w.bytes(&vec![0u8; header_len]);
        let (data_offset, metadata_start) = if trailing_metadata {
            let data_offset = w.len();
            self.write_objects(&mut w, data_offset, &starts);
            let metadata_start = w.len();
            w.u8(self.big_endian as u8);
            self.write_metadata(&mut w, &starts);
            (data_offset, metadata_start)
        } else {
            self.write_metadata(&mut w, &starts);
            w.align(16);
            let data_offset = w.len();
            self.write_objects(&mut w, data_offset, &starts);
            (data_offset, header_len)
        };
        let file_size = w.len();
        let metadata_size = if trailing_metadata {
            file_size - metadata_start
        } else {
            data_offset - header_len
        };

        w.patch_u32_be(0, metadata_size as u32);
        w.patch_u32_be(4, file_size as u32);
        w.patch_u32_be(8, format);
        w.patch_u32_be(12, data_offset as u32);
        if !trailing_metadata {
            w.buf[16] = self.big_endian as u8;
        }
        if wide {
            w.patch_u32_be(20, metadata_size as u32);
            w.buf[24..32].copy_from_slice(&(file_size as i64).to_be_bytes());
            w.buf[32..40].copy_from_slice(&(data_offset as i64).to_be_bytes());
        }
        w.buf
    }

    fn write_objects(&self, w: &mut Writer, data_offset: usize, starts: &[usize]) {
        for (obj, &start) in self.objects.iter().zip(starts) {
            while w.len() < data_offset + start {
                w.u8(0);
            }
            w.bytes(&obj.data);
        }
    }

    fn write_metadata(&self, w: &mut Writer, starts: &[usize]) {
        let format = self.format;
        if format >= 7 {
            w.cstr(&self.engine_version);
        }
        if format >= 8 {
            w.i32(self.platform);
        }
        let type_trees = format < 13 || self.type_trees;
        if format >= 13 {
            w.bool(self.type_trees);
        }

        w.i32(self.classes.len() as i32);
        for &class_id in &self.classes {
            w.i32(class_id);
            if format >= 16 {
                w.bool(false);
            }
            if format >= 17 {
                w.i16(-1);
            }
            if format >= 13 {
                if (format > 16 && class_id < 0) || (format >= 16 && class_id == 114) {
                    w.bytes(&[0x11; 16]);
                }
                w.bytes(&[0x22; 16]);
            }
            if type_trees {
                write_type_tree(w, format);
                if format >= 21 {
                    w.i32(0); // dependencies
                }
            }
        }
        if (7..14).contains(&format) {
            w.i32(self.big_ids as i32);
        }

        w.i32(self.objects.len() as i32);
        for (obj, &start) in self.objects.iter().zip(starts) {
            if self.big_ids {
                w.i64(obj.path_id);
            } else if format < 14 {
                w.i32(obj.path_id as i32);
            } else {
                w.align(4).i64(obj.path_id);
            }
            if format >= 22 {
                w.i64(start as i64);
            } else {
                w.u32(start as u32);
            }
            w.u32(obj.data.len() as u32);
            if format >= 16 {
                w.i32(obj.type_index as i32);
            } else {
                let class_id = self.classes[obj.type_index];
                w.i32(class_id).u16(class_id as u16);
            }
            if format < 11 {
                w.u16(0); // destroyed
            }
            if (11..17).contains(&format) {
                w.i16(obj.script_type_index);
            }
            if format == 15 || format == 16 {
                w.u8(0); // stripped
            }
        }

        if format >= 11 {
            w.i32(self.script_types.len() as i32);
            for &(file_index, path_id) in &self.script_types {
                w.i32(file_index);
                if format < 14 {
                    w.i32(path_id as i32);
                } else {
                    w.align(4).i64(path_id);
                }
            }
        }

        w.i32(self.declared_externals.unwrap_or(self.externals.len() as i32));
        for path in &self.externals {
            if format >= 6 {
                w.cstr("");
            }
            if format >= 5 {
                w.bytes(&[0x44; 16]).i32(0);
            }
            w.cstr(path);
        }
    }
}

pub const TREE_TYPE: &str = "NamedObject";
pub const TREE_NAME: &str = "Base";

/// A single-node tree describing the class root.
fn write_type_tree(w: &mut Writer, format: u32) {
    if format >= 12 || format == 10 {
        let strings = format!("{TREE_TYPE}\0{TREE_NAME}\0");
        w.i32(1).i32(strings.len() as i32);
        w.u16(1).u8(0).bool(false);
        w.u32(0).u32(TREE_TYPE.len() as u32 + 1);
        w.i32(-1).i32(0).i32(0);
        if format >= 19 {
            w.u64(0);
        }
        w.bytes(strings.as_bytes());
    } else {
        w.cstr(TREE_TYPE).cstr(TREE_NAME).i32(-1);
        if format == 2 {
            w.i32(1);
        }
        if format != 3 {
            w.i32(0);
        }
        w.i32(0).i32(1);
        if format != 3 {
            w.i32(0);
        }
        w.i32(0); // children
    }
}

// ── Object payloads (2019.4 layout) ──────────────────────────────────────────

pub fn named_object(name: &str) -> Vec<u8> {
    let mut w = Writer::le();
    w.aligned_str(name);
    w.buf
}

pub fn named_object_be(name: &str) -> Vec<u8> {
    let mut w = Writer::be();
    w.aligned_str(name);
    w.buf
}

pub enum Pixels<'a> {
    Inline(&'a [u8]),
    Streamed { path: &'a str, offset: u32, size: u32 },
}

pub fn texture2d(name: &str, width: i32, height: i32, format: i32, pixels: Pixels<'_>) -> Vec<u8> {
    let mut w = Writer::le();
    w.aligned_str(name);
    w.i32(0).bool(false).align(4); // fallback format, downscale fallback
    w.i32(width).i32(height).i32(0).i32(format).i32(1);
    w.bool(false).bool(false).bool(false).align(4); // readable, ignore limit, streaming mips
    w.i32(0).i32(1).i32(2); // streaming priority, image count, dimension
    w.i32(1).i32(1).f32(0.0).i32(1).i32(1).i32(1); // GL settings
    w.i32(0).i32(1); // lightmap format, color space
    match pixels {
        Pixels::Inline(data) => {
            w.i32(data.len() as i32).bytes(data).align(4);
        }
        Pixels::Streamed { path, offset, size } => {
            w.i32(0).u32(offset).u32(size).aligned_str(path);
        }
    }
    w.buf
}

pub fn sprite(name: &str, texture_path_id: i64) -> Vec<u8> {
    let mut w = Writer::le();
    w.aligned_str(name);
    w.floats(&[0.0, 0.0, 32.0, 16.0]); // rect
    w.floats(&[0.0, 0.0]); // offset
    w.floats(&[0.0; 4]); // border
    w.f32(100.0); // pixels to units
    w.floats(&[0.5, 0.5]); // pivot
    w.u32(1); // extrude
    w.bool(false).align(4); // is polygon
    w.bytes(&[0x33; 16]).i64(7); // render data key
    w.i32(0); // atlas tags
    w.pptr(0, 0); // sprite atlas

    // Render data
    w.pptr(0, texture_path_id);
    w.pptr(0, 0); // alpha texture
    w.i32(0); // secondary textures
    w.i32(1); // sub meshes
    w.u32(0).u32(6).i32(0).u32(0).u32(0).u32(4).floats(&[0.0; 6]);
    w.i32(12).bytes(&[0, 0, 1, 0, 2, 0, 2, 0, 3, 0, 0, 0]).align(4); // index buffer
    w.u32(4); // vertex count
    w.i32(1).bytes(&[0, 0, 0, 3]); // one channel
    w.i32(48).bytes(&[0u8; 48]).align(4); // vertex bytes
    w.i32(0); // bind pose
    w.floats(&[0.0, 0.0, 32.0, 16.0]); // texture rect
    w.floats(&[0.0, 0.0]); // texture rect offset
    w.floats(&[0.0, 0.0]); // atlas rect offset
    w.u32(0b0100_0001); // settings: packed, tight mesh
    w.floats(&[1.0, 1.0, 0.0, 0.0]); // uv transform
    w.f32(1.0); // downscale multiplier

    w.i32(0); // physics shape
    w.buf
}

// ── Archive ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lzma,
    Lz4,
    /// Stored bytes tagged with an arbitrary code.
    Code(u16),
}

impl Compression {
    fn code(self) -> u16 {
        match self {
            Compression::None    => 0,
            Compression::Lzma    => 1,
            Compression::Lz4     => 2,
            Compression::Code(c) => c,
        }
    }

    fn apply(self, data: &[u8]) -> Vec<u8> {
        match self {
            Compression::None | Compression::Code(_) => data.to_vec(),
            Compression::Lz4 => lz4_flex::block::compress(data),
            Compression::Lzma => {
                let mut packed = Vec::new();
                lzma_rs::lzma_compress(&mut std::io::Cursor::new(data), &mut packed).unwrap();
                // Drop the 8-byte size of the .lzma layout; archives store raw streams.
                let mut raw = packed[..5].to_vec();
                raw.extend_from_slice(&packed[13..]);
                raw
            }
        }
    }
}

pub struct BundleBuilder {
    pub version:          u32,
    pub engine_revision:  String,
    pub entries:          Vec<(String, Vec<u8>)>,
    pub blocks:           Compression,
    /// Split the stream into blocks of at most this many bytes.
    pub block_size:       usize,
    pub directory:        Compression,
    pub directory_at_end: bool,
    /// Added to the real uncompressed directory size in the header.
    pub directory_size_skew: i64,
    /// Extra block rows (uncompressed, compressed, flags) with no payload.
    pub phantom_blocks:   Vec<(u32, u32, u16)>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self {
            version:             7,
            engine_revision:     ENGINE.to_owned(),
            entries:             Vec::new(),
            blocks:              Compression::None,
            block_size:          usize::MAX,
            directory:           Compression::None,
            directory_at_end:    false,
            directory_size_skew: 0,
            phantom_blocks:      Vec::new(),
        }
    }

    pub fn entry(mut self, path: &str, data: Vec<u8>) -> Self {
        self.entries.push((path.to_owned(), data));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let stream: Vec<u8> = self.entries.iter().flat_map(|(_, d)| d.iter().copied()).collect();
        let chunks: Vec<&[u8]> = if stream.is_empty() {
            Vec::new()
        } else {
            stream.chunks(self.block_size.min(stream.len())).collect()
        };
        let packed: Vec<Vec<u8>> = chunks.iter().map(|c| self.blocks.apply(c)).collect();

        let mut dir = Writer::be();
        dir.bytes(&[0u8; 16]);
        dir.i32((chunks.len() + self.phantom_blocks.len()) as i32);
        for (raw, comp) in chunks.iter().zip(&packed) {
            dir.u32(raw.len() as u32).u32(comp.len() as u32).u16(self.blocks.code() | 0x40);
        }
        for &(uncompressed, compressed, flags) in &self.phantom_blocks {
            dir.u32(uncompressed).u32(compressed).u16(flags);
        }
        dir.i32(self.entries.len() as i32);
        let mut offset = 0i64;
        for (path, data) in &self.entries {
            dir.i64(offset).i64(data.len() as i64).u32(4).cstr(path);
            offset += data.len() as i64;
        }
        let dir_raw = dir.buf;
        let dir_packed = self.directory.apply(&dir_raw);

        let mut flags = self.directory.code() as u32 | 0x40;
        if self.directory_at_end {
            flags |= 0x80;
        }

        let mut w = Writer::be();
        w.cstr("UnityFS").u32(self.version).cstr("5.x.x").cstr(&self.engine_revision);
        let total_at = w.len();
        w.i64(0);
        w.u32(dir_packed.len() as u32);
        w.u32((dir_raw.len() as i64 + self.directory_size_skew) as u32);
        w.u32(flags);
        if self.version >= 7 {
            w.align(16);
        }
        if !self.directory_at_end {
            w.bytes(&dir_packed);
        }
        for block in &packed {
            w.bytes(block);
        }
        if self.directory_at_end {
            w.bytes(&dir_packed);
        }
        let total = w.len() as i64;
        w.buf[total_at..total_at + 8].copy_from_slice(&total.to_be_bytes());
        w.buf
    }
}
