//! Filename codec: strict template-driven decoding of archive filenames
//! into [`FileMetadata`] records.
//!
//! Templates are a fixed table keyed by (product level, product). Each
//! template is a token grammar of literal separators, fixed-width fields,
//! delimiter-terminated variable fields and inline date/time fields. The
//! table is the single source of truth for decode behavior; field widths
//! and separators mirror the storage backend's naming exactly.

use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    channel::Channel,
    checks,
    error::ArchError,
    metadata::FileMetadata,
    product::{Product, ProductLevel},
    satellite::Satellite,
    sector::{SceneAbbr, Sector},
};

/// Field a token writes into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Platform,
    ProductToken,
    Version,
    ChannelToken,
    SectorObs,
    SpatialRes,
    SegmentNumber,
    SegmentTotal,
    Ignore,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TimeField {
    Start,
    End,
    Production,
}

/// One token of a filename template.
#[derive(Clone, Copy, Debug)]
enum Token {
    /// Exact literal text.
    Lit(&'static str),
    /// Fixed-width string field.
    Str(Field, usize),
    /// Fixed-width zero-padded integer field.
    Int(Field, usize),
    /// Variable-length field terminated by (but not consuming) the next
    /// occurrence of the delimiter.
    VarUntil(Field, &'static str),
    /// Inline date/time with a fixed-width strptime-style format.
    DateTime(TimeField, &'static str),
    /// Consume the remainder of the name (optional trailing suffix).
    Rest(Field),
}

type Template = &'static [Token];

/// Segmented HSD radiance file, e.g.
/// `HS_H08_20211117_1130_B01_FLDK_R10_S0110.DAT.bz2`.
const L1B_RAD: Template = &[
    Token::Lit("HS_"),
    Token::Str(Field::Platform, 3),
    Token::Lit("_"),
    Token::DateTime(TimeField::Start, "%Y%m%d_%H%M"),
    Token::Lit("_"),
    Token::Str(Field::ChannelToken, 3),
    Token::Lit("_"),
    Token::Str(Field::SectorObs, 4),
    Token::Lit("_R"),
    Token::Int(Field::SpatialRes, 2),
    Token::Lit("_S"),
    Token::Int(Field::SegmentNumber, 2),
    Token::Int(Field::SegmentTotal, 2),
    Token::Lit(".DAT"),
    Token::Rest(Field::Ignore),
];

/// Post-2021 enterprise L2 naming, e.g.
/// `AHI-CMSK_v1r1_h09_s202111171130220_e202111171139400_c202111171145220.nc`.
/// The 15th start/end/production digit is tenths of a second and is
/// dropped by the cadence rounding step.
const L2_MODERN: Template = &[
    Token::Lit("AHI-"),
    Token::VarUntil(Field::ProductToken, "_v"),
    Token::Lit("_"),
    Token::VarUntil(Field::Version, "_"),
    Token::Lit("_"),
    Token::Str(Field::Platform, 3),
    Token::Lit("_s"),
    Token::DateTime(TimeField::Start, "%Y%m%d%H%M%S"),
    Token::Int(Field::Ignore, 1),
    Token::Lit("_e"),
    Token::DateTime(TimeField::End, "%Y%m%d%H%M%S"),
    Token::Int(Field::Ignore, 1),
    Token::Lit("_c"),
    Token::DateTime(TimeField::Production, "%Y%m%d%H%M%S"),
    Token::Int(Field::Ignore, 1),
    Token::Lit(".nc"),
];

/// Pre-2021 L2 naming: long product spelling, start time only, no sector
/// token (defaults to full disk downstream).
const L2_LEGACY: Template = &[
    Token::Lit("AHI-"),
    Token::VarUntil(Field::ProductToken, "_v"),
    Token::Lit("_"),
    Token::VarUntil(Field::Version, "_"),
    Token::Lit("_"),
    Token::Str(Field::Platform, 3),
    Token::Lit("_s"),
    Token::DateTime(TimeField::Start, "%Y%m%d%H%M%S"),
    Token::Int(Field::Ignore, 1),
    Token::Lit(".nc"),
];

/// Template table, keyed by (product level, product). Templates are tried
/// in order; the first full match wins.
fn templates_for(
    product_level: ProductLevel,
    product: Product,
) -> Result<&'static [Template], ArchError> {
    match (product_level, product) {
        (ProductLevel::L1b, Product::Rad) => Ok(&[L1B_RAD]),
        (ProductLevel::L2, Product::CMSK)
        | (ProductLevel::L2, Product::CHGT)
        | (ProductLevel::L2, Product::CPHS)
        | (ProductLevel::L2, Product::RRQPE) => Ok(&[L2_MODERN, L2_LEGACY]),
        (level, product) => {
            let level: &'static str = level.into();
            Err(ArchError::Configuration(format!(
                "no filename template registered for ({}, {:?})",
                level, product
            )))
        }
    }
}

/// Sector assumed for filenames that carry no sector token. Only the L2
/// templates omit the token, and every L2 product is full-disk only.
const DEFAULT_SECTOR: Sector = Sector::FullDisk;

/// Raw field values extracted by template matching, prior to the
/// normalization pipeline.
#[derive(Default, Debug)]
struct RawInfo {
    platform: Option<String>,
    product_token: Option<String>,
    version: Option<String>,
    channel_token: Option<String>,
    sector_obs: Option<String>,
    spatial_res: Option<u16>,
    segment_number: Option<u8>,
    segment_total: Option<u8>,
    start_time: Option<NaiveDateTime>,
    end_time: Option<NaiveDateTime>,
    production_time: Option<NaiveDateTime>,
}

impl RawInfo {
    fn set_str(&mut self, field: Field, value: &str) {
        match field {
            Field::Platform => self.platform = Some(value.to_owned()),
            Field::ProductToken => self.product_token = Some(value.to_owned()),
            Field::Version => self.version = Some(value.to_owned()),
            Field::ChannelToken => self.channel_token = Some(value.to_owned()),
            Field::SectorObs => self.sector_obs = Some(value.to_owned()),
            _ => {}
        }
    }

    fn set_int(&mut self, field: Field, value: u32) {
        match field {
            Field::SpatialRes => self.spatial_res = Some(value as u16),
            Field::SegmentNumber => self.segment_number = Some(value as u8),
            Field::SegmentTotal => self.segment_total = Some(value as u8),
            _ => {}
        }
    }

    fn set_time(&mut self, field: TimeField, value: NaiveDateTime) {
        match field {
            TimeField::Start => self.start_time = Some(value),
            TimeField::End => self.end_time = Some(value),
            TimeField::Production => self.production_time = Some(value),
        }
    }
}

/// Width in characters of a fixed strptime-style format.
fn format_width(fmt: &str) -> usize {
    let mut width = 0;
    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('Y') => width += 4,
                Some('m') | Some('d') | Some('H') | Some('M') | Some('S') => width += 2,
                _ => width += 1,
            }
        } else {
            width += 1;
        }
    }
    width
}

fn parse_datetime(fname: &str, input: &str, fmt: &str) -> Result<NaiveDateTime, ArchError> {
    let (mut year, mut month, mut day) = (0i32, 1u32, 1u32);
    let (mut hour, mut minute, mut second) = (0u32, 0u32, 0u32);
    let mut cursor = 0usize;
    let bytes = input.as_bytes();

    let take = |n: usize, cursor: &mut usize| -> Result<u32, ArchError> {
        let end = *cursor + n;
        if end > bytes.len() {
            return Err(ArchError::decode(fname, "truncated date field"));
        }
        let slice = &input[*cursor..end];
        *cursor = end;
        slice
            .parse::<u32>()
            .map_err(|_| ArchError::decode(fname, format!("non-numeric date field '{}'", slice)))
    };

    let mut chars = fmt.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('Y') => year = take(4, &mut cursor)? as i32,
                Some('m') => month = take(2, &mut cursor)?,
                Some('d') => day = take(2, &mut cursor)?,
                Some('H') => hour = take(2, &mut cursor)?,
                Some('M') => minute = take(2, &mut cursor)?,
                Some('S') => second = take(2, &mut cursor)?,
                other => {
                    return Err(ArchError::Configuration(format!(
                        "unsupported date directive %{:?}",
                        other
                    )))
                }
            }
        } else {
            if cursor >= bytes.len() || bytes[cursor] != c as u8 {
                return Err(ArchError::decode(fname, "date separator mismatch"));
            }
            cursor += 1;
        }
    }

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| ArchError::decode(fname, "date field out of range"))
}

/// Match a filename against one template, extracting raw field values.
fn match_template(fname: &str, template: Template) -> Result<RawInfo, ArchError> {
    let mut info = RawInfo::default();
    let mut cursor = 0usize;

    for token in template {
        let rest = &fname[cursor..];
        match token {
            Token::Lit(lit) => {
                if !rest.starts_with(lit) {
                    return Err(ArchError::decode(
                        fname,
                        format!("expected '{}' at offset {}", lit, cursor),
                    ));
                }
                cursor += lit.len();
            }
            Token::Str(field, width) => {
                if rest.len() < *width {
                    return Err(ArchError::decode(fname, "name shorter than template"));
                }
                info.set_str(*field, &rest[..*width]);
                cursor += width;
            }
            Token::Int(field, width) => {
                if rest.len() < *width {
                    return Err(ArchError::decode(fname, "name shorter than template"));
                }
                let digits = &rest[..*width];
                let value = digits.parse::<u32>().map_err(|_| {
                    ArchError::decode(fname, format!("expected {} digits, got '{}'", width, digits))
                })?;
                info.set_int(*field, value);
                cursor += width;
            }
            Token::VarUntil(field, delim) => {
                let idx = rest.find(delim).ok_or_else(|| {
                    ArchError::decode(fname, format!("missing '{}' separator", delim))
                })?;
                if idx == 0 {
                    return Err(ArchError::decode(fname, "empty variable field"));
                }
                info.set_str(*field, &rest[..idx]);
                cursor += idx;
            }
            Token::DateTime(field, fmt) => {
                let width = format_width(fmt);
                if rest.len() < width {
                    return Err(ArchError::decode(fname, "name shorter than template"));
                }
                let value = parse_datetime(fname, &rest[..width], fmt)?;
                info.set_time(*field, value);
                cursor += width;
            }
            Token::Rest(field) => {
                info.set_str(*field, rest);
                cursor = fname.len();
            }
        }
    }

    if cursor != fname.len() {
        return Err(ArchError::decode(
            fname,
            format!("trailing characters at offset {}", cursor),
        ));
    }

    Ok(info)
}

/// Split the combined `<sector><observation>` token of L1b names into
/// sector, scene and the 1-based observation index within the parent
/// 10-minute slot.
fn split_sector_obs(
    fname: &str,
    token: &str,
) -> Result<(Sector, Option<SceneAbbr>, Option<u32>), ArchError> {
    if token == "FLDK" {
        return Ok((Sector::FullDisk, None, None));
    }
    let obs = |digits: &str| -> Result<u32, ArchError> {
        digits
            .parse::<u32>()
            .map_err(|_| ArchError::decode(fname, format!("bad observation number '{}'", digits)))
    };
    if let Some(digits) = token.strip_prefix("JP") {
        // Japan slots cover both R1 and R2 in a single file.
        return Ok((Sector::Japan, None, Some(obs(digits)?)));
    }
    if let Some(digits) = token.strip_prefix("R3") {
        return Ok((Sector::Target, Some(SceneAbbr::R3), Some(obs(digits)?)));
    }
    if let Some(digits) = token.strip_prefix("R4") {
        return Ok((Sector::Landmark, Some(SceneAbbr::R4), Some(obs(digits)?)));
    }
    if let Some(digits) = token.strip_prefix("R5") {
        return Ok((Sector::Landmark, Some(SceneAbbr::R5), Some(obs(digits)?)));
    }
    Err(ArchError::decode(
        fname,
        format!("unrecognized sector token '{}'", token),
    ))
}

/// Run the ordered normalization pipeline over raw template output.
fn normalize(fname: &str, raw: RawInfo, product_level: ProductLevel) -> Result<FileMetadata, ArchError> {
    // (a) Round sub-minute timestamps to the archive's 30-second grid.
    let mut start_time = raw
        .start_time
        .map(checks::snap_to_half_minute)
        .ok_or_else(|| ArchError::decode(fname, "missing start time"))?;
    let mut end_time = raw.end_time.map(checks::snap_to_half_minute);
    let production_time = raw.production_time.map(checks::snap_to_half_minute);

    // (b) Split the sector+observation token and shift the acquisition
    // window to the observation's slot within the 10-minute block.
    let mut sector = None;
    let mut scene_abbr = None;
    if let Some(token) = &raw.sector_obs {
        let (sec, scene, observation) = split_sector_obs(fname, token)?;
        sector = Some(sec);
        scene_abbr = scene;
        if let Some(n) = observation {
            let step = sec.acquisition_cadence();
            start_time += step * (n as i32 - 1);
            end_time = Some(start_time + step);
        }
    }

    // (d) Files without a sector token are full-disk L2 products.
    let sector = sector.unwrap_or(DEFAULT_SECTOR);

    // (c) Synthesize a missing end time from the sector granularity.
    let end_time = end_time.unwrap_or_else(|| start_time + sector.native_granularity());

    // (e) Normalize legacy product spellings to canonical keys.
    let product = match &raw.product_token {
        Some(token) => Product::from_raw_token(token).ok_or_else(|| {
            ArchError::decode(fname, format!("unrecognized product token '{}'", token))
        })?,
        None => Product::Rad,
    };

    // (f) Derive the satellite from the platform token.
    let platform = raw
        .platform
        .as_deref()
        .ok_or_else(|| ArchError::decode(fname, "missing platform token"))?;
    let satellite = Satellite::from_platform_code(platform).ok_or_else(|| {
        ArchError::decode(fname, format!("unrecognized platform token '{}'", platform))
    })?;

    let channel = match &raw.channel_token {
        Some(token) => Some(Channel::from_fname_token(token).ok_or_else(|| {
            ArchError::decode(fname, format!("unrecognized channel token '{}'", token))
        })?),
        None => None,
    };

    if start_time > end_time {
        return Err(ArchError::decode(fname, "start time after end time"));
    }

    Ok(FileMetadata {
        satellite,
        product_level,
        product,
        sector,
        scene_abbr,
        channel,
        spatial_res: raw.spatial_res,
        segment_number: raw.segment_number,
        segment_total: raw.segment_total,
        start_time,
        end_time,
        production_time,
        version: raw.version,
    })
}

/// Decode a bare filename in a known (level, product) context.
///
/// Decoding is strict: a name that matches none of the context's
/// templates is an error, not a skip.
pub fn decode_filename(
    fname: &str,
    product_level: ProductLevel,
    product: Product,
) -> Result<FileMetadata, ArchError> {
    // Archive names are pure ASCII; rejecting anything else up front
    // keeps the fixed-width token slicing byte-safe.
    if !fname.is_ascii() {
        return Err(ArchError::decode(fname, "non-ascii characters in name"));
    }
    let templates = templates_for(product_level, product)?;
    let mut last_err = None;
    for template in templates {
        match match_template(fname, template) {
            Ok(raw) => return normalize(fname, raw, product_level),
            Err(err) => last_err = Some(err),
        }
    }
    Err(last_err.unwrap_or_else(|| ArchError::decode(fname, "no template matched")))
}

/// Decode a full path, inferring the (level, product) context from the
/// filename itself.
pub fn decode_path(path: &str) -> Result<FileMetadata, ArchError> {
    let fname = basename(path);
    let (level, product) = infer_context(fname)?;
    decode_filename(fname, level, product)
}

/// Infer (level, product) from a bare filename by scanning for known
/// product spellings.
pub(crate) fn infer_context(fname: &str) -> Result<(ProductLevel, Product), ArchError> {
    if fname.starts_with("HS_") {
        return Ok((ProductLevel::L1b, Product::Rad));
    }
    const L2_PRODUCTS: [Product; 4] =
        [Product::CMSK, Product::CHGT, Product::CPHS, Product::RRQPE];
    for product in &L2_PRODUCTS {
        if product
            .raw_spellings()
            .iter()
            .any(|spelling| fname.contains(spelling))
        {
            return Ok((ProductLevel::L2, *product));
        }
    }
    Err(ArchError::decode(fname, "product not inferable from name"))
}

pub(crate) fn basename(path: &str) -> &str {
    let path = path.split('#').next().unwrap_or(path);
    path.rsplit('/').next().unwrap_or(path)
}
