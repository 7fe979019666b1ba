//! Netpbm coder: `P2`/`P3`/`P5`/`P6` and PAM (`P7`), multi-frame.

use magick_ffi_common::abi::severity;

use crate::exception::ExceptionInfo;
use crate::image::Image;
use crate::quantum::{self, Quantum};
use crate::settings::Settings;

struct Header {
    magic: u8,
    width: usize,
    height: usize,
    maxval: u32,
    /// Channels stored in the file (1 gray, 2 gray+alpha, 3 rgb, 4 rgba)
    channels: usize,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    comments: Vec<String>,
}

impl<'a> Cursor<'a> {
    fn skip_whitespace_and_comments(&mut self) {
        while self.pos < self.data.len() {
            match self.data[self.pos] {
                b'#' => {
                    let start = self.pos + 1;
                    while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    let comment = String::from_utf8_lossy(&self.data[start..self.pos]);
                    self.comments.push(comment.trim().to_string());
                }
                b if b.is_ascii_whitespace() => self.pos += 1,
                _ => break,
            }
        }
    }

    fn token(&mut self) -> Option<&'a str> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let data = self.data;
        std::str::from_utf8(&data[start..self.pos]).ok()
    }

    fn number(&mut self) -> Option<u32> {
        self.token()?.parse().ok()
    }

    fn line(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
            self.pos += 1;
        }
        let data = self.data;
        let line = std::str::from_utf8(&data[start..self.pos]).ok()?;
        if self.pos < self.data.len() {
            self.pos += 1;
        }
        Some(line.trim())
    }
}

fn read_header(cursor: &mut Cursor<'_>) -> Option<Header> {
    let magic = cursor.token()?;
    let magic = match magic.as_bytes() {
        [b'P', m @ b'2'..=b'7'] if *m != b'4' => *m,
        _ => return None,
    };

    if magic == b'7' {
        return read_pam_header(cursor);
    }

    let width = cursor.number()? as usize;
    let height = cursor.number()? as usize;
    let maxval = cursor.number()?;
    // exactly one whitespace byte separates the header from a binary raster
    cursor.pos += 1;
    let channels = if magic == b'2' || magic == b'5' { 1 } else { 3 };
    Some(Header {
        magic,
        width,
        height,
        maxval,
        channels,
    })
}

fn read_pam_header(cursor: &mut Cursor<'_>) -> Option<Header> {
    let mut header = Header {
        magic: b'7',
        width: 0,
        height: 0,
        maxval: 255,
        channels: 0,
    };
    loop {
        cursor.skip_whitespace_and_comments();
        let line = cursor.line()?;
        let (key, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        match key {
            "WIDTH" => header.width = value.trim().parse().ok()?,
            "HEIGHT" => header.height = value.trim().parse().ok()?,
            "MAXVAL" => header.maxval = value.trim().parse().ok()?,
            "DEPTH" => header.channels = value.trim().parse().ok()?,
            "TUPLTYPE" => {}
            "ENDHDR" => break,
            _ => return None,
        }
    }
    if !(1..=4).contains(&header.channels) {
        return None;
    }
    Some(header)
}

fn read_samples(
    cursor: &mut Cursor<'_>,
    header: &Header,
    count: usize,
) -> Option<Vec<u32>> {
    match header.magic {
        b'2' | b'3' => (0..count).map(|_| cursor.number()).collect(),
        _ => {
            let width = if header.maxval < 256 { 1 } else { 2 };
            let end = cursor.pos.checked_add(count.checked_mul(width)?)?;
            let bytes = cursor.data.get(cursor.pos..end)?;
            cursor.pos = end;
            Some(if width == 1 {
                bytes.iter().map(|&b| u32::from(b)).collect()
            } else {
                bytes
                    .chunks_exact(2)
                    .map(|c| u32::from(u16::from_be_bytes([c[0], c[1]])))
                    .collect()
            })
        }
    }
}

fn expand(samples: &[u32], header: &Header) -> (Vec<Quantum>, bool) {
    let has_alpha = header.channels == 2 || header.channels == 4;
    let out_channels = if has_alpha { 4 } else { 3 };
    let mut pixels = Vec::with_capacity(header.width * header.height * out_channels);
    for pixel in samples.chunks_exact(header.channels) {
        let scaled: Vec<Quantum> = pixel
            .iter()
            .map(|&s| quantum::scale_from(s.min(header.maxval), header.maxval))
            .collect();
        match header.channels {
            1 => pixels.extend_from_slice(&[scaled[0], scaled[0], scaled[0]]),
            2 => pixels.extend_from_slice(&[scaled[0], scaled[0], scaled[0], scaled[1]]),
            _ => pixels.extend_from_slice(&scaled),
        }
    }
    (pixels, has_alpha)
}

fn decode_frame(
    cursor: &mut Cursor<'_>,
    settings: &Settings,
    exception: &mut ExceptionInfo,
) -> Option<Image> {
    cursor.comments.clear();
    let Some(header) = read_header(cursor) else {
        exception.throw(severity::CORRUPT_IMAGE_ERROR, "improper image header");
        return None;
    };
    if header.width == 0 || header.height == 0 || header.maxval == 0 || header.maxval > 65535 {
        exception.throw(severity::CORRUPT_IMAGE_ERROR, "improper image header");
        return None;
    }

    let count = header
        .width
        .checked_mul(header.height)
        .and_then(|n| n.checked_mul(header.channels));
    let Some(samples) = count.and_then(|count| read_samples(cursor, &header, count)) else {
        exception.throw(
            severity::CORRUPT_IMAGE_ERROR,
            "insufficient image data in file",
        );
        return None;
    };

    let (pixels, has_alpha) = expand(&samples, &header);
    let depth = if header.maxval < 256 { 8 } else { 16 };
    let format = if header.magic == b'7' { "PAM" } else { "PNM" };
    let mut image = Image::header(header.width, header.height, depth, format);
    image.has_alpha = has_alpha;
    image.pixels = if settings.ping { None } else { Some(pixels) };
    if !cursor.comments.is_empty() {
        image
            .attributes
            .insert("comment".to_string(), cursor.comments.join("\n"));
    }
    Some(image)
}

pub(super) fn decode(data: &[u8], settings: &Settings, exception: &mut ExceptionInfo) -> Vec<Image> {
    let mut cursor = Cursor {
        data,
        pos: 0,
        comments: Vec::new(),
    };
    let mut images = Vec::new();

    while let Some(image) = decode_frame(&mut cursor, settings, exception) {
        images.push(image);

        while cursor.pos < data.len() && data[cursor.pos].is_ascii_whitespace() {
            cursor.pos += 1;
        }
        let rest = &data[cursor.pos.min(data.len())..];
        if rest.is_empty() {
            break;
        }
        if !matches!(rest, [b'P', b'2'..=b'3' | b'5'..=b'7', ..]) {
            exception.throw_with_description(
                severity::CORRUPT_IMAGE_WARNING,
                "extraneous data after image",
                format!("{} bytes", rest.len()),
            );
            break;
        }
    }
    images
}

pub(super) fn encode(image: &Image, format: &str, settings: &Settings, out: &mut Vec<u8>) {
    let Some(pixels) = image.pixels.as_ref() else {
        return;
    };
    let maxval: u32 = if image.depth <= 8 { 255 } else { 65535 };
    let channels = image.channel_count();
    let pam = format == "PAM";
    let out_channels = if pam { channels } else { 3 };

    let comment = settings
        .option("pnm:comment")
        .map(str::to_string)
        .or_else(|| image.attributes.get("comment").cloned());

    if pam {
        out.extend_from_slice(b"P7\n");
        push_comment(out, comment.as_deref());
        let tupltype = if image.has_alpha { "RGB_ALPHA" } else { "RGB" };
        out.extend_from_slice(
            format!(
                "WIDTH {}\nHEIGHT {}\nDEPTH {}\nMAXVAL {}\nTUPLTYPE {}\nENDHDR\n",
                image.width, image.height, out_channels, maxval, tupltype
            )
            .as_bytes(),
        );
    } else {
        out.extend_from_slice(b"P6\n");
        push_comment(out, comment.as_deref());
        out.extend_from_slice(format!("{} {}\n{}\n", image.width, image.height, maxval).as_bytes());
    }

    for pixel in pixels.chunks_exact(channels) {
        for &sample in &pixel[..out_channels] {
            let value = quantum::scale_to(sample, maxval);
            if maxval < 256 {
                out.push(value as u8);
            } else {
                out.extend_from_slice(&(value as u16).to_be_bytes());
            }
        }
    }
}

fn push_comment(out: &mut Vec<u8>, comment: Option<&str>) {
    if let Some(comment) = comment {
        for line in comment.lines() {
            out.extend_from_slice(format!("# {line}\n").as_bytes());
        }
    }
}
