//! The OPS container
//!
//! A 12 byte header (`OPS1`, save version, cell size, width and height in
//! cells, little-endian document length) followed by a bzip2 stream of one
//! BSON document. Grids and particles travel as user-subtype binaries
//! inside that document.

use std::collections::BTreeSet;
use std::io::{Read, Write};

use bzip2::Compression;
use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use powdersim_simulation::{
    CELL, ElementId as E, NPART, PMAPBITS, Particle, ParticleFlags, WallId, XCELLS, XRES,
    YCELLS, YRES, change_wallpp, round_pos,
};

use super::bson::{BINARY_USER, Bson, Document};
use super::compat::{is_builtin_gol, upgrade_particle};
use super::{
    BUILD_NUM, BuildError, FAKE_MINOR_VERSION, FAKE_SAVE_VERSION, MAX_DOCUMENT_SIZE,
    MINOR_VERSION, MOD_SAVE_VERSION, ParseError, SAVE_VERSION, Save, SaveInfo,
};
use crate::sign::{Justification, MAX_SIGNS, Sign, truncate_text};

const HEADER_LEN: usize = 12;

// Field descriptor bits of a particle record
const FD_TEMP_16: u16 = 1 << 0;
const FD_LIFE: u16 = 1 << 1;
const FD_LIFE_16: u16 = 1 << 2;
const FD_TMP: u16 = 1 << 3;
const FD_TMP_16: u16 = 1 << 4;
const FD_CTYPE: u16 = 1 << 5;
const FD_DECO: u16 = 1 << 6;
const FD_VX: u16 = 1 << 7;
const FD_VY: u16 = 1 << 8;
const FD_CTYPE_32: u16 = 1 << 9;
const FD_TMP2: u16 = 1 << 10;
const FD_TMP2_16: u16 = 1 << 11;
const FD_TMP_32: u16 = 1 << 12;
const FD_PAVG: u16 = 1 << 13;
/// Second type byte; older mod versions also stored flags under this bit
const FD_TYPE_16: u16 = 1 << 14;

/// Room temperature used as the origin of one byte temperatures
const TEMP_ORIGIN: f32 = 294.15;

/// Elements whose pavg is stored scaled by 64
fn pavg_is_scaled(element: u16) -> bool {
    matches!(element, E::QRTZ | E::GLAS | E::TUNG)
}

#[cfg(all(target_os = "windows", target_pointer_width = "64"))]
const PLATFORM: &str = "WIN64";
#[cfg(all(target_os = "windows", not(target_pointer_width = "64")))]
const PLATFORM: &str = "WIN32";
#[cfg(target_os = "macos")]
const PLATFORM: &str = "MACOSX";
#[cfg(all(target_os = "linux", target_pointer_width = "64"))]
const PLATFORM: &str = "LIN64";
#[cfg(all(target_os = "linux", not(target_pointer_width = "64")))]
const PLATFORM: &str = "LIN32";
#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
const PLATFORM: &str = "UNKNOWN";

fn wrong_type(key: &str, expected: &str, value: &Bson) {
    log::warn!(
        "Wrong type for {key}, expected {expected}, got {}",
        value.type_name()
    );
}

fn read_bool(key: &str, value: &Bson) -> Option<bool> {
    let flag = value.as_bool();
    if flag.is_none() {
        wrong_type(key, "bool", value);
    }
    flag
}

fn read_int(key: &str, value: &Bson) -> Option<i32> {
    let int = value.as_i32();
    if int.is_none() {
        wrong_type(key, "int", value);
    }
    int
}

/// Doubles are read through their integer part
fn read_float(key: &str, value: &Bson) -> Option<f32> {
    match value {
        Bson::Double(v) => Some(*v as i32 as f32),
        _ => {
            wrong_type(key, "double", value);
            None
        }
    }
}

fn read_blob<'a>(key: &str, value: &'a Bson) -> Option<&'a [u8]> {
    let data = value.as_user_binary();
    if data.is_none() {
        log::warn!("Invalid datatype for {key}: {}", value.type_name());
    }
    data
}

/// Integers of an array (or object) in order, other entries skipped
fn int_entries(doc: &Document) -> impl Iterator<Item = i32> + '_ {
    doc.iter().filter_map(|(_, v)| v.as_i32())
}

/// The user binaries a document can carry
#[derive(Default)]
struct Blobs<'a> {
    parts: Option<&'a [u8]>,
    parts_pos: Option<&'a [u8]>,
    walls: Option<&'a [u8]>,
    fans: Option<&'a [u8]>,
    pressure: Option<&'a [u8]>,
    vx: Option<&'a [u8]>,
    vy: Option<&'a [u8]>,
    ambient: Option<&'a [u8]>,
    soap_links: Option<&'a [u8]>,
}

pub(super) fn parse(data: &[u8]) -> Result<Save, ParseError> {
    let created_version = data[4] as i32;
    if data[5] as i32 != CELL {
        return Err(ParseError::WrongCellSize);
    }
    let block_width = data[6] as usize;
    let block_height = data[7] as usize;
    if block_width > XCELLS || block_height > YCELLS {
        return Err(ParseError::RegionTooLarge);
    }
    let declared = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as u64;
    if declared + 1 > MAX_DOCUMENT_SIZE {
        return Err(ParseError::PayloadTooLarge);
    }

    let document = decompress(&data[HEADER_LEN..], declared)?;
    let doc = Document::from_bytes(&document)?;

    let mut save = Save::new(block_width, block_height);
    save.created_version = created_version;
    let blobs = read_document(&mut save, &doc);

    read_grids(&mut save, &blobs)?;
    if let (Some(parts), Some(positions)) = (blobs.parts, blobs.parts_pos) {
        read_particles(&mut save, parts, positions)?;
        if let Some(links) = blobs.soap_links {
            read_soap_links(&mut save, links);
        }
    }

    if save.mobile_created_version != 0 {
        save.admin_log_messages.push(format!(
            "Made in android build version {}",
            save.mobile_created_version
        ));
    } else if save.mod_created_version != 0 {
        save.admin_log_messages.push(format!(
            "Made in jacob1's mod version {}",
            save.mod_created_version
        ));
    }
    for message in &save.admin_log_messages {
        log::info!("{message}");
    }
    Ok(save)
}

fn decompress(compressed: &[u8], declared: u64) -> Result<Vec<u8>, ParseError> {
    let mut out = Vec::new();
    BzDecoder::new(compressed)
        .take(declared + 1)
        .read_to_end(&mut out)
        .map_err(|e| ParseError::DecompressionFailed(e.to_string()))?;
    if out.len() as u64 > declared {
        return Err(ParseError::DecompressionFailed(
            "output larger than declared".to_string(),
        ));
    }
    Ok(out)
}

/// Settings and metadata; binaries are returned for the grid readers
fn read_document<'a>(save: &mut Save, doc: &'a Document) -> Blobs<'a> {
    let mut blobs = Blobs::default();
    for (key, value) in doc.iter() {
        let settings = &mut save.settings;
        match key {
            "parts" => blobs.parts = read_blob(key, value).or(blobs.parts),
            "partsPos" => blobs.parts_pos = read_blob(key, value).or(blobs.parts_pos),
            "wallMap" => blobs.walls = read_blob(key, value).or(blobs.walls),
            "fanMap" => blobs.fans = read_blob(key, value).or(blobs.fans),
            "pressMap" => blobs.pressure = read_blob(key, value).or(blobs.pressure),
            "vxMap" => blobs.vx = read_blob(key, value).or(blobs.vx),
            "vyMap" => blobs.vy = read_blob(key, value).or(blobs.vy),
            "ambientMap" => blobs.ambient = read_blob(key, value).or(blobs.ambient),
            "soapLinks" => blobs.soap_links = read_blob(key, value).or(blobs.soap_links),

            "legacyEnable" => {
                if let Some(v) = read_bool(key, value) {
                    settings.legacy_enable = v;
                }
            }
            "gravityEnable" => {
                if let Some(v) = read_bool(key, value) {
                    settings.gravity_enable = v;
                }
            }
            "aheat_enable" => {
                if let Some(v) = read_bool(key, value) {
                    settings.aheat_enable = v;
                }
            }
            "waterEEnabled" => {
                if let Some(v) = read_bool(key, value) {
                    settings.water_equal = v;
                }
            }
            "paused" => {
                if let Some(v) = read_bool(key, value) {
                    settings.paused = v;
                }
            }
            "gravityMode" => {
                if let Some(v) = read_int(key, value) {
                    settings.gravity_mode = v;
                }
            }
            "airMode" => {
                if let Some(v) = read_int(key, value) {
                    settings.air_mode = v;
                }
            }
            "edgeMode" => {
                if let Some(v) = read_int(key, value) {
                    settings.edge_mode = v;
                }
            }
            "pmapbits" => {
                if let Some(v) = read_int(key, value) {
                    save.pmapbits = v;
                }
            }
            "msrotation" => settings.msrotation = read_bool(key, value).or(settings.msrotation),
            "hud_enable" => settings.hud_enable = read_bool(key, value).or(settings.hud_enable),
            "decorations_enable" => {
                settings.decorations_enable = read_bool(key, value).or(settings.decorations_enable)
            }
            "activeMenu" => settings.active_menu = read_int(key, value).or(settings.active_menu),
            "ambientAirTemp" => {
                settings.ambient_air_temp = read_float(key, value).or(settings.ambient_air_temp)
            }

            "signs" => match value.as_array() {
                Some(signs) => read_signs(save, signs),
                None => log::warn!("Wrong type for {key}"),
            },
            "stkm" => match value.as_document() {
                Some(stkm) => read_stkm(save, stkm),
                None => log::warn!("Wrong type for {key}"),
            },
            "palette" => {
                save.palette.clear();
                match value.as_array() {
                    Some(palette) => save.palette.extend(
                        palette
                            .iter()
                            .filter_map(|(id, v)| v.as_i32().map(|num| (id.to_string(), num))),
                    ),
                    None => log::warn!("Wrong type for element palette: {}", value.type_name()),
                }
            }
            "minimumVersion" => match value.as_document() {
                Some(version) => read_minimum_version(save, version),
                None => log::warn!("Wrong type for {key}"),
            },
            "leftSelectedElementIdentifier" | "rightSelectedElementIdentifier" => {
                match value.as_str() {
                    Some(id) if key.starts_with('l') => save.left_selected = id.to_string(),
                    Some(id) => save.right_selected = id.to_string(),
                    None => log::warn!("Wrong type for {key}"),
                }
            }
            "Jacob1's_Mod" => match value.as_i32() {
                Some(version) => save.mod_created_version = version,
                None => log::warn!("Wrong type for {key}"),
            },
            "origin" => match value.as_document() {
                Some(origin) => {
                    if let Some(build) = origin.get("mobileBuildVersion") {
                        match build.as_i32() {
                            Some(version) => save.mobile_created_version = version,
                            None => log::warn!("Wrong type for mobileBuildVersion"),
                        }
                    }
                }
                None => log::warn!("Wrong type for {key}"),
            },
            "saveInfo" => match value.as_document() {
                Some(info) => save.save_info = Some(read_save_info(info)),
                None => log::warn!("Wrong type for {key}"),
            },
            "render_modes" | "display_modes" => {
                let Some(list) = value.as_array().or_else(|| value.as_document()) else {
                    log::warn!("Wrong type for {key}");
                    continue;
                };
                let modes: BTreeSet<u32> = int_entries(list).map(|m| m as u32).collect();
                if key == "render_modes" {
                    save.render_modes = Some(modes);
                } else {
                    save.display_modes = Some(modes);
                }
            }
            "color_mode" => {
                if let Some(mode) = value.as_i32() {
                    save.color_mode = Some(mode as u32);
                }
            }
            "authors" => match value.as_document() {
                Some(authors) => save.authors = Some(authors.clone()),
                None => log::warn!("Wrong type for {key}"),
            },
            _ => {}
        }
    }
    blobs
}

fn read_signs(save: &mut Save, signs: &Document) {
    for (key, value) in signs.iter() {
        if key != "sign" {
            continue;
        }
        let Some(fields) = value.as_document() else {
            log::warn!("Wrong type for {key}");
            continue;
        };
        if save.signs.len() >= MAX_SIGNS {
            break;
        }
        let mut sign = Sign::new("", 0, 0, Justification::Middle);
        for (field, v) in fields.iter() {
            match (field, v) {
                ("text", Bson::String(text)) => {
                    let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
                    sign.text = truncate_text(&cleaned);
                }
                ("justification", Bson::Int32(j)) => {
                    if let Some(justification) = Justification::from_i32(*j) {
                        sign.justification = justification;
                    }
                }
                ("x", Bson::Int32(x)) => sign.x = *x,
                ("y", Bson::Int32(y)) => sign.y = *y,
                _ => log::warn!("Unknown sign property {field}"),
            }
        }
        save.signs.push(sign);
    }
}

fn read_stkm(save: &mut Save, stkm: &Document) {
    let options = &mut save.stkm;
    for (key, value) in stkm.iter() {
        match key {
            "rocketBoots1" => options.rocket_boots1 = read_bool(key, value).unwrap_or(options.rocket_boots1),
            "rocketBoots2" => options.rocket_boots2 = read_bool(key, value).unwrap_or(options.rocket_boots2),
            "fan1" => options.fan1 = read_bool(key, value).unwrap_or(options.fan1),
            "fan2" => options.fan2 = read_bool(key, value).unwrap_or(options.fan2),
            "rocketBootsFigh" => {
                if let Some(list) = value.as_array() {
                    options.rocket_boots_figh.extend(int_entries(list));
                }
            }
            "fanFigh" => {
                if let Some(list) = value.as_array() {
                    options.fan_figh.extend(int_entries(list));
                }
            }
            _ => {}
        }
    }
}

fn read_minimum_version(save: &mut Save, version: &Document) {
    let (mut major, mut minor) = (i32::MAX, i32::MAX);
    for (key, value) in version.iter() {
        match (key, value.as_i32()) {
            ("major", Some(v)) => major = v,
            ("minor", Some(v)) => minor = v,
            (_, Some(_)) => log::warn!("Unexpected minimumVersion field {key}"),
            (_, None) => {}
        }
    }
    save.minimum_version = Some((major, minor));
    if (major, minor) > (FAKE_SAVE_VERSION, FAKE_MINOR_VERSION) {
        let message = format!("Save from a newer version: Requires version {major}.{minor}");
        log::warn!("{message}");
        save.log_messages.push(message);
    }
}

fn read_save_info(doc: &Document) -> SaveInfo {
    let mut info = SaveInfo::default();
    for (key, value) in doc.iter() {
        match (key, value) {
            ("saveOpened", Bson::Int32(v)) => info.save_opened = *v != 0,
            ("fileOpened", Bson::Int32(v)) => info.file_opened = *v != 0,
            ("saveName", Bson::String(s)) => info.save_name = s.clone(),
            ("fileName", Bson::String(s)) => info.file_name = s.clone(),
            ("published", Bson::Int32(v)) => info.published = *v != 0,
            ("ID", Bson::String(s)) => info.id = s.trim().parse().unwrap_or(0),
            ("version", Bson::String(s)) => info.version = s.clone(),
            ("description", Bson::String(s)) => info.description = s.clone(),
            ("author", Bson::String(s)) => info.author = s.clone(),
            ("tags", Bson::String(s)) => info.tags = s.clone(),
            ("myVote", Bson::Int32(v)) => info.my_vote = *v,
            _ => log::warn!("Unknown save info property {key}"),
        }
    }
    info
}

/// Two-byte fixed point grid value, 1/128 steps offset by 256
fn decode_air(lo: u8, hi: u8) -> f32 {
    (lo as u32 + ((hi as u32) << 8)) as f32 / 128.0 - 256.0
}

fn encode_air(value: f32) -> [u8; 2] {
    let scaled = ((value.clamp(-255.0, 255.0) + 256.0) * 128.0) as i32;
    [scaled as u8, (scaled >> 8) as u8]
}

/// Walls, fans and the air grids, stored column by column
fn read_grids(save: &mut Save, blobs: &Blobs) -> Result<(), ParseError> {
    let (bw, bh) = (save.block_width, save.block_height);
    let cells = bw * bh;

    if let Some(walls) = blobs.walls {
        if walls.len() < cells {
            return Err(ParseError::NotEnoughData("wall"));
        }
        let mut j = 0;
        for x in 0..bw {
            for y in 0..bh {
                let i = y * bw + x;
                let raw = walls[i];
                if raw != 0
                    && let Some(wall) = change_wallpp(raw)
                {
                    save.walls[i] = wall;
                }
                if raw == WallId::FAN
                    && let Some(fans) = blobs.fans
                {
                    if j + 1 >= fans.len() {
                        log::warn!("Not enough fan data");
                        continue;
                    }
                    save.fan_vx[i] = (fans[j] as f32 - 127.0) / 64.0;
                    save.fan_vy[i] = (fans[j + 1] as f32 - 127.0) / 64.0;
                    j += 2;
                }
            }
        }
    }

    let air_grids: [(Option<&[u8]>, &'static str, &mut Vec<f32>); 3] = [
        (blobs.pressure, "pressure", &mut save.pressure),
        (blobs.vx, "vx", &mut save.vx),
        (blobs.vy, "vy", &mut save.vy),
    ];
    for (blob, name, grid) in air_grids {
        let Some(data) = blob else { continue };
        if data.len() < cells * 2 {
            return Err(ParseError::NotEnoughData(name));
        }
        let mut j = 0;
        for x in 0..bw {
            for y in 0..bh {
                grid[y * bw + x] = decode_air(data[j], data[j + 1]);
                j += 2;
            }
        }
    }
    if blobs.pressure.is_some() {
        save.has_pressure = true;
    }

    if let Some(data) = blobs.ambient {
        if data.len() < cells * 2 {
            return Err(ParseError::NotEnoughData("ambient heat"));
        }
        save.has_ambient_heat = true;
        let mut j = 0;
        for x in 0..bw {
            for y in 0..bh {
                save.ambient_heat[y * bw + x] = (data[j] as u32 | (data[j + 1] as u32) << 8) as f32;
                j += 2;
            }
        }
    }
    Ok(())
}

/// Cursor over the particle blob that refuses to run past its end
struct Records<'a> {
    data: &'a [u8],
    pos: usize,
}

impl Records<'_> {
    fn byte(&mut self, field: &'static str) -> Result<u8, ParseError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or(ParseError::TruncatedField(field))?;
        self.pos += 1;
        Ok(b)
    }

    fn u16(&mut self, field: &'static str) -> Result<u32, ParseError> {
        let lo = self.byte(field)? as u32;
        Ok(lo | (self.byte(field)? as u32) << 8)
    }
}

fn read_particles(save: &mut Save, parts: &[u8], positions: &[u8]) -> Result<(), ParseError> {
    let full_w = save.full_width() as usize;
    let full_h = save.full_height() as usize;
    if positions.len() < full_w * full_h * 3 {
        return Err(ParseError::NotEnoughData("particle position"));
    }
    let mod_version = save.mod_created_version;
    let mut records = Records { data: parts, pos: 0 };
    let mut pos_index = 0;

    for y in 0..full_h {
        for x in 0..full_w {
            let count = (positions[pos_index] as usize) << 16
                | (positions[pos_index + 1] as usize) << 8
                | positions[pos_index + 2] as usize;
            pos_index += 3;

            for _ in 0..count {
                if records.pos + 3 >= parts.len() {
                    return Err(ParseError::TruncatedField("particle"));
                }
                if x as i32 >= XRES || y as i32 >= YRES {
                    return Err(ParseError::PositionOutOfRange);
                }
                if save.particles.len() >= NPART {
                    return Err(ParseError::TooManyParticles);
                }
                let mut p = Particle {
                    element: records.byte("type")? as u16,
                    x: x as f32,
                    y: y as f32,
                    ..Particle::EMPTY
                };
                let fd = records.u16("particle")? as u16;

                if fd & FD_TYPE_16 != 0 {
                    p.element |= (records.byte("type")? as u16) << 8;
                }
                p.temp = if fd & FD_TEMP_16 != 0 {
                    records.u16("temp")? as f32
                } else {
                    records.byte("temp")? as i8 as f32 + TEMP_ORIGIN
                };
                if fd & FD_LIFE != 0 {
                    p.life = records.byte("life")? as i32;
                    if fd & FD_LIFE_16 != 0 {
                        p.life |= (records.byte("life")? as i32) << 8;
                    }
                }
                if fd & FD_TMP != 0 {
                    let mut tmp = records.byte("tmp")? as u32;
                    if fd & FD_TMP_16 != 0 {
                        tmp |= (records.byte("tmp")? as u32) << 8;
                        if fd & FD_TMP_32 != 0 {
                            tmp |= (records.byte("tmp")? as u32) << 24;
                            tmp |= (records.byte("tmp")? as u32) << 16;
                        }
                    }
                    p.tmp = tmp as i32;
                }
                if fd & FD_CTYPE != 0 {
                    let mut ctype = records.byte("ctype")? as u32;
                    if fd & FD_CTYPE_32 != 0 {
                        ctype |= (records.byte("ctype")? as u32) << 24;
                        ctype |= (records.byte("ctype")? as u32) << 16;
                        ctype |= (records.byte("ctype")? as u32) << 8;
                    }
                    p.ctype = ctype as i32;
                }
                if fd & FD_DECO != 0 {
                    let mut argb = 0u32;
                    for _ in 0..4 {
                        argb = argb << 8 | records.byte("deco")? as u32;
                    }
                    p.dcolour = argb;
                }
                if fd & FD_VX != 0 {
                    p.vx = (records.byte("vx")? as f32 - 127.0) / 16.0;
                }
                if fd & FD_VY != 0 {
                    p.vy = (records.byte("vy")? as f32 - 127.0) / 16.0;
                }
                if fd & FD_TMP2 != 0 {
                    p.tmp2 = records.byte("tmp2")? as i32;
                    if fd & FD_TMP2_16 != 0 {
                        p.tmp2 |= (records.byte("tmp2")? as i32) << 8;
                    }
                }
                if fd & FD_PAVG != 0 {
                    let mut pavg = [records.u16("pavg")? as f32, records.u16("pavg")? as f32];
                    if pavg_is_scaled(p.element) {
                        for v in &mut pavg {
                            if *v >= 32768.0 {
                                *v -= 65536.0;
                            }
                            *v /= 64.0;
                        }
                    }
                    p.pavg = pavg;
                }
                if (1..=20).contains(&mod_version) && fd & FD_TYPE_16 != 0 {
                    p.flags = ParticleFlags::from_bits_retain(records.byte("flags")? as u32);
                }

                // Links are rebuilt from the soapLinks blob
                if p.element == E::SOAP {
                    p.ctype &= !6;
                }
                upgrade_particle(&mut p, save.created_version);
                save.particles.push(p);
            }
        }
    }
    if records.pos != parts.len() {
        return Err(ParseError::TrailingParticleData);
    }
    Ok(())
}

/// Forward links of SOAP particles, 1-based indices into the saved order
fn read_soap_links(save: &mut Save, links: &[u8]) {
    let count = save.particles.len();
    let mut chunks = links.chunks_exact(3);
    for i in 0..count {
        if save.particles[i].element != E::SOAP {
            continue;
        }
        let Some(link) = chunks.next() else { break };
        let linked = (link[0] as usize) << 16 | (link[1] as usize) << 8 | link[2] as usize;
        if linked == 0 || linked - 1 >= count {
            continue;
        }
        let linked = linked - 1;
        save.particles[i].ctype |= 2;
        save.particles[i].tmp = linked as i32;
        save.particles[linked].ctype |= 4;
        save.particles[linked].tmp2 = i as i32;
    }
}

/// Lowest version able to load what is being written
struct MinimumVersion((i32, i32));

impl MinimumVersion {
    fn restrict(&mut self, major: i32, minor: i32) {
        self.0 = self.0.max((major, minor));
    }
}

pub(super) fn build(save: &Save) -> Result<Vec<u8>, BuildError> {
    let mut min_version = MinimumVersion((90, 2));
    let (bw, bh) = (save.block_width, save.block_height);
    let cells = bw * bh;

    let mut walls = vec![0u8; cells];
    let mut has_walls = false;
    let mut fans = Vec::new();
    let mut pressure = Vec::new();
    let mut vx = Vec::new();
    let mut vy = Vec::new();
    let mut ambient = Vec::new();
    for x in 0..bw {
        for y in 0..bh {
            let i = y * bw + x;
            let wall = save.walls[i];
            walls[i] = wall;
            has_walls |= wall != 0;

            if save.has_pressure {
                pressure.extend_from_slice(&encode_air(save.pressure[i]));
                vx.extend_from_slice(&encode_air(save.vx[i]));
                vy.extend_from_slice(&encode_air(save.vy[i]));
            }
            if save.has_ambient_heat {
                let heat = (save.ambient_heat[i] + 0.5) as i32;
                ambient.extend_from_slice(&[heat as u8, (heat >> 8) as u8]);
            }
            if wall == WallId::FAN {
                for v in [save.fan_vx[i], save.fan_vy[i]] {
                    fans.push(((v * 64.0 + 127.5) as i32).clamp(0, 255) as u8);
                }
            } else if wall == WallId::STASIS {
                min_version.restrict(94, 0);
            }
        }
    }

    let (parts, positions, soap_links) = encode_particles(save, &mut min_version);

    let mut doc = Document::new();
    let mut origin = Document::new();
    origin.push("majorVersion", Bson::Int32(SAVE_VERSION as i32));
    origin.push("minorVersion", Bson::Int32(MINOR_VERSION));
    origin.push("buildNum", Bson::Int32(BUILD_NUM));
    origin.push("snapshotId", Bson::Int32(0));
    origin.push("releaseType", Bson::String("R".into()));
    origin.push("platform", Bson::String(PLATFORM.into()));
    origin.push("builtType", Bson::String("NO".into()));
    doc.push("origin", Bson::Document(origin));

    let settings = &save.settings;
    let ambient_temp = settings
        .ambient_air_temp
        .filter(|t| (t - powdersim_simulation::ROOM_TEMP).abs() > 0.0001);
    if ambient_temp.is_some() {
        min_version.restrict(96, 0);
    }
    let (major, minor) = min_version.0;
    let mut minimum = Document::new();
    minimum.push("major", Bson::Int32(major));
    minimum.push("minor", Bson::Int32(minor));
    doc.push("minimumVersion", Bson::Document(minimum));

    doc.push("waterEEnabled", Bson::Bool(settings.water_equal));
    doc.push("legacyEnable", Bson::Bool(settings.legacy_enable));
    doc.push("gravityEnable", Bson::Bool(settings.gravity_enable));
    doc.push("paused", Bson::Bool(settings.paused));
    doc.push("gravityMode", Bson::Int32(settings.gravity_mode));
    doc.push("airMode", Bson::Int32(settings.air_mode));
    if let Some(temp) = ambient_temp {
        doc.push("ambientAirTemp", Bson::Double(temp as f64));
    }
    doc.push("msrotation", Bson::Bool(settings.msrotation.unwrap_or(false)));
    if let Some(enabled) = settings.decorations_enable {
        doc.push("decorations_enable", Bson::Bool(enabled));
    }
    if let Some(enabled) = settings.hud_enable {
        doc.push("hud_enable", Bson::Bool(enabled));
    }
    doc.push("aheat_enable", Bson::Bool(settings.aheat_enable));
    doc.push("edgeMode", Bson::Int32(settings.edge_mode));

    if save.stkm.has_data() {
        doc.push("stkm", Bson::Document(stkm_document(save)));
    }
    for (modes, list_key, item_key) in [
        (&save.render_modes, "render_modes", "render_mode"),
        (&save.display_modes, "display_modes", "display_mode"),
    ] {
        let Some(modes) = modes.as_ref().filter(|m| !m.is_empty()) else {
            continue;
        };
        let mut list = Document::new();
        for &mode in modes {
            list.push(item_key, Bson::Int32(mode as i32));
        }
        doc.push(list_key, Bson::Array(list));
        let bits = modes.iter().fold(0u32, |acc, &m| acc | m);
        doc.push(item_key, Bson::Int32(bits as i32));
    }
    if let Some(mode) = save.color_mode {
        doc.push("color_mode", Bson::Int32(mode as i32));
    }
    doc.push("Jacob1's_Mod", Bson::Int32(MOD_SAVE_VERSION));
    doc.push(
        "leftSelectedElementIdentifier",
        Bson::String(save.left_selected.clone()),
    );
    doc.push(
        "rightSelectedElementIdentifier",
        Bson::String(save.right_selected.clone()),
    );
    if let Some(menu) = settings.active_menu {
        doc.push("activeMenu", Bson::Int32(menu));
    }
    doc.push("pmapbits", Bson::Int32(PMAPBITS as i32));

    let user = |data: Vec<u8>| Bson::Binary {
        subtype: BINARY_USER,
        data,
    };
    if !parts.is_empty() {
        doc.push("parts", user(parts));
        let mut palette = Document::new();
        for (identifier, id) in &save.palette {
            palette.push(identifier.as_str(), Bson::Int32(*id));
        }
        doc.push("palette", Bson::Array(palette));
        doc.push("partsPos", user(positions));
    }
    if has_walls {
        doc.push("wallMap", user(walls));
    }
    if !fans.is_empty() {
        doc.push("fanMap", user(fans));
    }
    if save.has_pressure && !pressure.is_empty() {
        doc.push("pressMap", user(pressure));
        doc.push("vxMap", user(vx));
        doc.push("vyMap", user(vy));
    }
    if save.has_ambient_heat && !ambient.is_empty() {
        doc.push("ambientMap", user(ambient));
    }
    if !soap_links.is_empty() {
        doc.push("soapLinks", user(soap_links));
    }
    if !save.signs.is_empty() {
        let mut signs = Document::new();
        for sign in &save.signs {
            let mut entry = Document::new();
            entry.push("text", Bson::String(sign.text.clone()));
            entry.push("justification", Bson::Int32(sign.justification as i32));
            entry.push("x", Bson::Int32(sign.x));
            entry.push("y", Bson::Int32(sign.y));
            signs.push("sign", Bson::Document(entry));
        }
        doc.push("signs", Bson::Array(signs));
    }
    if let Some(info) = &save.save_info {
        doc.push("saveInfo", Bson::Document(save_info_document(info)));
    }
    if let Some(authors) = save.authors.as_ref().filter(|a| !a.is_empty()) {
        doc.push("authors", Bson::Document(authors.clone()));
    }

    pack(&doc, bw, bh)
}

/// Wrap a document in the OPS header and compress it
pub(super) fn pack(doc: &Document, block_width: usize, block_height: usize) -> Result<Vec<u8>, BuildError> {
    let bytes = doc.to_bytes();
    if bytes.len() as u64 + 1 > MAX_DOCUMENT_SIZE {
        return Err(BuildError::DocumentTooLarge(bytes.len()));
    }
    let mut out = Vec::with_capacity(HEADER_LEN + bytes.len() / 2);
    out.extend_from_slice(b"OPS1");
    out.extend_from_slice(&[
        SAVE_VERSION,
        CELL as u8,
        block_width as u8,
        block_height as u8,
    ]);
    out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());

    let mut encoder = BzEncoder::new(out, Compression::best());
    encoder
        .write_all(&bytes)
        .map_err(|e| BuildError::Compression(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| BuildError::Compression(e.to_string()))
}

/// Particle records, per-pixel counts and SOAP links
///
/// Particles are written pixel by pixel in raster order, keeping their
/// original order within a pixel. Particles outside the region are dropped.
fn encode_particles(save: &Save, min_version: &mut MinimumVersion) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let full_w = save.full_width();
    let full_h = save.full_height();

    let mut order: Vec<(usize, usize)> = save
        .particles
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_empty())
        .filter_map(|(i, p)| {
            let (x, y) = (round_pos(p.x), round_pos(p.y));
            let inside = p.x >= 0.0 && p.y >= 0.0 && x < full_w && y < full_h;
            inside.then(|| ((y * full_w + x) as usize, i))
        })
        .collect();
    order.sort_by_key(|&(pixel, _)| pixel);

    let mut counts = vec![0u32; (full_w * full_h) as usize];
    for &(pixel, _) in &order {
        counts[pixel] += 1;
    }
    let positions: Vec<u8> = counts
        .iter()
        .flat_map(|&c| [(c >> 16) as u8, (c >> 8) as u8, c as u8])
        .collect();

    // saved index + 1 for each particle, 0 when not written
    let mut save_index = vec![0u32; save.particles.len()];
    let mut parts = Vec::new();
    for (n, &(_, i)) in order.iter().enumerate() {
        save_index[i] = n as u32 + 1;
        let p = &save.particles[i];
        encode_particle(&mut parts, p, save.has_pressure);
        restrict_for_particle(min_version, p);
    }

    let mut soap_links = Vec::new();
    for &(_, i) in &order {
        let p = &save.particles[i];
        if p.element != E::SOAP {
            continue;
        }
        let linked = if p.ctype & 2 != 0 && (0..NPART as i32).contains(&p.tmp) {
            save_index.get(p.tmp as usize).copied().unwrap_or(0)
        } else {
            0
        };
        soap_links.extend_from_slice(&[(linked >> 16) as u8, (linked >> 8) as u8, linked as u8]);
    }

    (parts, positions, soap_links)
}

fn encode_particle(out: &mut Vec<u8>, p: &Particle, has_pressure: bool) {
    let mut fd: u16 = 0;
    out.push(p.element as u8);
    let fd_at = out.len();
    out.extend_from_slice(&[0, 0]);

    if p.element & 0xFF00 != 0 {
        out.push((p.element >> 8) as u8);
        fd |= FD_TYPE_16;
    }

    if (p.temp - TEMP_ORIGIN).abs() < 127.0 {
        out.push((p.temp - TEMP_ORIGIN + 0.5).floor() as i32 as u8);
    } else {
        fd |= FD_TEMP_16;
        let temp = (p.temp + 0.5) as i32;
        out.extend_from_slice(&[temp as u8, (temp >> 8) as u8]);
    }

    if p.life != 0 {
        let life = p.life.clamp(0, 0xFFFF);
        fd |= FD_LIFE;
        out.push(life as u8);
        if life & 0xFF00 != 0 {
            fd |= FD_LIFE_16;
            out.push((life >> 8) as u8);
        }
    }

    let builtin_life = p.element == E::LIFE && is_builtin_gol(p.ctype);
    if p.tmp != 0 {
        fd |= FD_TMP;
        if builtin_life {
            // built-in rules keep their state in tmp2, read back into tmp
            out.push((p.tmp2 & 0xFF) as u8);
        } else {
            let tmp = p.tmp as u32;
            out.push(tmp as u8);
            if tmp & 0xFFFF_FF00 != 0 {
                fd |= FD_TMP_16;
                out.push((tmp >> 8) as u8);
                if tmp & 0xFFFF_0000 != 0 {
                    fd |= FD_TMP_32;
                    out.extend_from_slice(&[(tmp >> 24) as u8, (tmp >> 16) as u8]);
                }
            }
        }
    }

    if p.ctype != 0 {
        let ctype = p.ctype as u32;
        fd |= FD_CTYPE;
        out.push(ctype as u8);
        if ctype & 0xFFFF_FF00 != 0 {
            fd |= FD_CTYPE_32;
            out.extend_from_slice(&[(ctype >> 24) as u8, (ctype >> 16) as u8, (ctype >> 8) as u8]);
        }
    }

    let alpha = p.dcolour >> 24;
    if p.dcolour != 0 && (alpha != 0 || (p.element == E::LIFE && !is_builtin_gol(p.ctype))) {
        fd |= FD_DECO;
        out.extend_from_slice(&p.dcolour.to_be_bytes());
    }

    for (v, bit) in [(p.vx, FD_VX), (p.vy, FD_VY)] {
        if v.abs() > 0.001 {
            fd |= bit;
            out.push(((v * 16.0 + 127.5) as i32).clamp(0, 255) as u8);
        }
    }

    if p.tmp2 != 0 {
        fd |= FD_TMP2;
        out.push(p.tmp2 as u8);
        if p.tmp2 & 0xFF00 != 0 {
            fd |= FD_TMP2_16;
            out.push((p.tmp2 >> 8) as u8);
        }
    }

    if p.pavg[0] != 0.0 || p.pavg[1] != 0.0 {
        let scaled = pavg_is_scaled(p.element);
        // scaled pavg only means something alongside the pressure grid
        if !scaled || has_pressure {
            let factor = if scaled { 64.0 } else { 1.0 };
            fd |= FD_PAVG;
            for v in p.pavg {
                let v = (v * factor) as i32;
                out.extend_from_slice(&[v as u8, (v >> 8) as u8]);
            }
        }
    }

    out[fd_at..fd_at + 2].copy_from_slice(&fd.to_le_bytes());
}

/// Raise the minimum version for elements and fields older readers misread
fn restrict_for_particle(min_version: &mut MinimumVersion, p: &Particle) {
    let t = p.element;
    if p.element & 0xFF00 != 0 {
        min_version.restrict(93, 0);
    }
    if t == E::RPEL && p.ctype != 0 {
        min_version.restrict(91, 4);
    } else if t == E::NWHL && p.tmp != 0 {
        min_version.restrict(91, 5);
    }
    if matches!(t, E::HEAC | E::SAWD | E::POLO | E::RFRG | E::RFGL | E::LSNS) {
        min_version.restrict(92, 0);
    } else if matches!(t, E::FRAY | E::INVIS) && p.tmp != 0 {
        min_version.restrict(92, 0);
    } else if matches!(t, E::PIPE | E::PPIP) {
        min_version.restrict(93, 0);
    } else if matches!(t, E::TSNS | E::PSNS | E::HSWC | E::PUMP) && p.tmp == 1 {
        min_version.restrict(93, 0);
    }
    if PMAPBITS > 8
        && ((Save::type_in_ctype(t, p.ctype) && p.ctype > 0xFF)
            || (Save::type_in_tmp(t) && p.tmp > 0xFF)
            || (Save::type_in_tmp2(t, p.tmp2) && p.tmp2 > 0xFF))
    {
        min_version.restrict(93, 0);
    }
    if t == E::LDTC {
        min_version.restrict(94, 0);
    }
    if matches!(t, E::TSNS | E::PSNS) && p.tmp == 2 {
        min_version.restrict(94, 0);
    }
    if t == E::LSNS {
        min_version.restrict(95, 0);
    }
    if t == E::LIFE && !is_builtin_gol(p.ctype) {
        min_version.restrict(96, 0);
    }
}

fn stkm_document(save: &Save) -> Document {
    let stkm = &save.stkm;
    let mut doc = Document::new();
    for (key, flag) in [
        ("rocketBoots1", stkm.rocket_boots1),
        ("rocketBoots2", stkm.rocket_boots2),
        ("fan1", stkm.fan1),
        ("fan2", stkm.fan2),
    ] {
        if flag {
            doc.push(key, Bson::Bool(true));
        }
    }
    for (key, fighters) in [
        ("rocketBootsFigh", &stkm.rocket_boots_figh),
        ("fanFigh", &stkm.fan_figh),
    ] {
        if fighters.is_empty() {
            continue;
        }
        let mut list = Document::new();
        for &num in fighters {
            list.push("num", Bson::Int32(num));
        }
        doc.push(key, Bson::Array(list));
    }
    doc
}

fn save_info_document(info: &SaveInfo) -> Document {
    let mut doc = Document::new();
    doc.push("saveOpened", Bson::Int32(info.save_opened as i32));
    doc.push("fileOpened", Bson::Int32(info.file_opened as i32));
    doc.push("saveName", Bson::String(info.save_name.clone()));
    doc.push("fileName", Bson::String(info.file_name.clone()));
    doc.push("published", Bson::Int32(info.published as i32));
    doc.push("ID", Bson::String(info.id.to_string()));
    doc.push("version", Bson::String(info.version.clone()));
    doc.push("description", Bson::String(info.description.clone()));
    doc.push("author", Bson::String(info.author.clone()));
    doc.push("tags", Bson::String(info.tags.clone()));
    doc.push("myVote", Bson::Int32(info.my_vote));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use powdersim_simulation::ROOM_TEMP;

    fn user(data: Vec<u8>) -> Bson {
        Bson::Binary {
            subtype: BINARY_USER,
            data,
        }
    }

    /// Particle blob and a position blob with one particle at the origin
    fn single_particle_doc(record: Vec<u8>, bw: usize, bh: usize) -> Document {
        let pixels = bw * bh * (CELL * CELL) as usize;
        let mut positions = vec![0u8; pixels * 3];
        positions[2] = 1;
        let mut doc = Document::new();
        doc.push("parts", user(record));
        doc.push("partsPos", user(positions));
        doc
    }

    #[test]
    fn test_round_trip_keeps_fields() {
        let mut save = Save::new(4, 3);
        let mut hot = Particle::new(E::LAVA, 5.0, 6.0);
        hot.temp = 2000.0;
        hot.life = 300;
        hot.ctype = E::STNE as i32;
        hot.tmp = 0x1234_5678;
        hot.tmp2 = 0x1FF;
        hot.vx = 1.5;
        hot.vy = -2.0;
        hot.dcolour = 0xFF10_2030;
        save.push_particle(hot);
        let mut cold = Particle::new(E::WATR, 5.0, 6.0);
        cold.temp = 280.15;
        save.push_particle(cold);
        save.push_particle(Particle::new(E::DUST, 0.0, 0.0));
        let wall_idx = save.block_index(1, 1);
        save.walls[wall_idx] = WallId::WALL;
        save.settings.gravity_mode = 2;
        save.settings.paused = true;
        save.signs.push(Sign::new("hello", 3, 4, Justification::Right));

        let parsed = Save::parse(&save.build().unwrap()).unwrap();
        assert_eq!(parsed.particles.len(), 3);
        // raster order: the DUST at (0, 0) comes first
        assert_eq!(parsed.particles[0].element, E::DUST);
        let lava = parsed.particles[1];
        assert_eq!(lava.element, E::LAVA);
        assert_eq!((lava.x, lava.y), (5.0, 6.0));
        assert_eq!(lava.temp, 2000.0);
        assert_eq!(lava.life, 300);
        assert_eq!(lava.ctype, E::STNE as i32);
        assert_eq!(lava.tmp, 0x1234_5678);
        assert_eq!(lava.tmp2, 0x1FF);
        assert_eq!((lava.vx, lava.vy), (1.5, -2.0));
        assert_eq!(lava.dcolour, 0xFF10_2030);
        // same pixel keeps insertion order
        assert_eq!(parsed.particles[2].element, E::WATR);
        assert_eq!(parsed.particles[2].temp, 280.15);

        assert_eq!(parsed.walls[parsed.block_index(1, 1)], WallId::WALL);
        assert_eq!(parsed.settings.gravity_mode, 2);
        assert!(parsed.settings.paused);
        assert_eq!(parsed.signs, save.signs);
        assert_eq!(parsed.created_version, SAVE_VERSION as i32);
        assert_eq!(parsed.mod_created_version, MOD_SAVE_VERSION);
        assert_eq!(parsed.pmapbits, PMAPBITS as i32);
    }

    #[test]
    fn test_air_grids_quantise() {
        let mut save = Save::new(2, 2);
        save.has_pressure = true;
        save.has_ambient_heat = true;
        save.pressure[1] = 3.25;
        save.vx[2] = -300.0;
        save.ambient_heat[3] = 400.4;
        let parsed = Save::parse(&save.build().unwrap()).unwrap();
        assert!(parsed.has_pressure && parsed.has_ambient_heat);
        assert_eq!(parsed.pressure[1], 3.25);
        assert_eq!(parsed.vx[2], -255.0);
        assert_eq!(parsed.ambient_heat[3], 400.0);
    }

    #[test]
    fn test_fan_velocities_round_trip() {
        let mut save = Save::new(2, 1);
        save.walls[1] = WallId::FAN;
        save.fan_vx[1] = 0.5;
        save.fan_vy[1] = -1.0;
        let parsed = Save::parse(&save.build().unwrap()).unwrap();
        assert_eq!(parsed.walls[1], WallId::FAN);
        assert!((parsed.fan_vx[1] - 0.5).abs() < 1.0 / 64.0);
        assert!((parsed.fan_vy[1] + 1.0).abs() < 1.0 / 64.0);
    }

    #[test]
    fn test_soap_links_survive() {
        let mut save = Save::new(2, 1);
        let mut a = Particle::new(E::SOAP, 1.0, 1.0);
        let mut b = Particle::new(E::SOAP, 2.0, 1.0);
        a.ctype = 2;
        a.tmp = 1;
        b.ctype = 4;
        b.tmp2 = 0;
        save.push_particle(a);
        save.push_particle(b);
        let parsed = Save::parse(&save.build().unwrap()).unwrap();
        assert_eq!(parsed.particles[0].ctype & 6, 2);
        assert_eq!(parsed.particles[0].tmp, 1);
        assert_eq!(parsed.particles[1].ctype & 6, 4);
        assert_eq!(parsed.particles[1].tmp2, 0);
    }

    #[test]
    fn test_wrong_cell_size() {
        let mut data = Save::new(1, 1).build().unwrap();
        data[5] = 8;
        assert_eq!(Save::parse(&data), Err(ParseError::WrongCellSize));
    }

    #[test]
    fn test_region_too_large() {
        let mut data = Save::new(1, 1).build().unwrap();
        data[6] = (XCELLS + 1) as u8;
        assert_eq!(Save::parse(&data), Err(ParseError::RegionTooLarge));
    }

    #[test]
    fn test_oversized_document_rejected_before_decompression() {
        let mut data = b"OPS1".to_vec();
        data.extend_from_slice(&[SAVE_VERSION, CELL as u8, 1, 1]);
        data.extend_from_slice(&(300u32 * 1024 * 1024).to_le_bytes());
        // not a bzip2 stream, so reaching decompression would fail differently
        data.extend_from_slice(b"garbage");
        assert_eq!(Save::parse(&data), Err(ParseError::PayloadTooLarge));
    }

    #[test]
    fn test_garbage_stream_fails_to_decompress() {
        let mut data = b"OPS1".to_vec();
        data.extend_from_slice(&[SAVE_VERSION, CELL as u8, 1, 1, 16, 0, 0, 0]);
        data.extend_from_slice(b"definitely not bzip2");
        assert!(matches!(
            Save::parse(&data),
            Err(ParseError::DecompressionFailed(_))
        ));
    }

    #[test]
    fn test_truncated_life_field() {
        // DUST, descriptor with life set, temp byte, then nothing
        let record = vec![E::DUST as u8, FD_LIFE as u8, 0, 0];
        let data = pack(&single_particle_doc(record, 1, 1), 1, 1).unwrap();
        assert_eq!(
            Save::parse(&data),
            Err(ParseError::TruncatedField("life"))
        );
    }

    #[test]
    fn test_trailing_particle_bytes() {
        let record = vec![E::DUST as u8, 0, 0, 0, 99];
        let data = pack(&single_particle_doc(record, 1, 1), 1, 1).unwrap();
        assert_eq!(Save::parse(&data), Err(ParseError::TrailingParticleData));
    }

    #[test]
    fn test_short_position_blob() {
        let mut doc = Document::new();
        doc.push("parts", user(vec![1, 0, 0, 0]));
        doc.push("partsPos", user(vec![0; 5]));
        let data = pack(&doc, 1, 1).unwrap();
        assert_eq!(
            Save::parse(&data),
            Err(ParseError::NotEnoughData("particle position"))
        );
    }

    #[test]
    fn test_short_pressure_blob() {
        let mut doc = Document::new();
        doc.push("pressMap", user(vec![0; 3]));
        let data = pack(&doc, 2, 1).unwrap();
        assert_eq!(
            Save::parse(&data),
            Err(ParseError::NotEnoughData("pressure"))
        );
    }

    #[test]
    fn test_one_byte_temperature_offset() {
        let record = vec![E::DUST as u8, 0, 0, (-20i8) as u8];
        let data = pack(&single_particle_doc(record, 1, 1), 1, 1).unwrap();
        let save = Save::parse(&data).unwrap();
        assert!((save.particles[0].temp - (TEMP_ORIGIN - 20.0)).abs() < 1e-3);
    }

    #[test]
    fn test_minimum_version_from_newer_release() {
        let mut version = Document::new();
        version.push("major", Bson::Int32(97));
        version.push("minor", Bson::Int32(1));
        let mut doc = Document::new();
        doc.push("minimumVersion", Bson::Document(version));
        let save = Save::parse(&pack(&doc, 1, 1).unwrap()).unwrap();
        assert_eq!(save.minimum_version, Some((97, 1)));
        assert_eq!(
            save.log_messages,
            ["Save from a newer version: Requires version 97.1"]
        );
    }

    #[test]
    fn test_minimum_version_restrictions() {
        let minimum = |save: &Save| {
            let data = save.build().unwrap();
            Save::parse(&data).unwrap().minimum_version.unwrap()
        };
        let mut save = Save::new(1, 1);
        assert_eq!(minimum(&save), (90, 2));

        save.push_particle(Particle::new(E::LDTC, 1.0, 1.0));
        assert_eq!(minimum(&save), (94, 0));

        save.settings.ambient_air_temp = Some(ROOM_TEMP + 10.0);
        assert_eq!(minimum(&save), (96, 0));
    }

    #[test]
    fn test_wrong_setting_type_is_skipped() {
        let mut doc = Document::new();
        doc.push("gravityMode", Bson::String("radial".into()));
        doc.push("edgeMode", Bson::Int32(1));
        let save = Save::parse(&pack(&doc, 1, 1).unwrap()).unwrap();
        assert_eq!(save.settings.gravity_mode, 0);
        assert_eq!(save.settings.edge_mode, 1);
    }

    #[test]
    fn test_mod_version_admin_note() {
        let mut doc = Document::new();
        doc.push("Jacob1's_Mod", Bson::Int32(21));
        let save = Save::parse(&pack(&doc, 1, 1).unwrap()).unwrap();
        assert_eq!(save.admin_log_messages, ["Made in jacob1's mod version 21"]);
    }

    #[test]
    fn test_scaled_pavg_needs_pressure() {
        let mut save = Save::new(1, 1);
        let mut quartz = Particle::new(E::QRTZ, 1.0, 1.0);
        quartz.pavg = [1.5, -2.0];
        save.push_particle(quartz);

        let without = Save::parse(&save.build().unwrap()).unwrap();
        assert_eq!(without.particles[0].pavg, [0.0, 0.0]);

        save.has_pressure = true;
        let with = Save::parse(&save.build().unwrap()).unwrap();
        assert_eq!(with.particles[0].pavg, [1.5, -2.0]);
    }

    #[test]
    fn test_render_modes_and_save_info() {
        let mut save = Save::new(1, 1);
        save.render_modes = Some([1, 4].into_iter().collect());
        save.save_info = Some(SaveInfo {
            id: 1234,
            save_name: "bridge".into(),
            published: true,
            ..Default::default()
        });
        let parsed = Save::parse(&save.build().unwrap()).unwrap();
        assert_eq!(parsed.render_modes, save.render_modes);
        assert_eq!(parsed.save_info, save.save_info);
        assert_eq!(parsed.display_modes, None);
    }
}
