//! Negotiates formats against a simulated hardware profile and prints the
//! resulting buffer layouts.
//!
//! The profile offers every codec with default capabilities, plus 10-bit and
//! block-compressed support for HEVC and VP9, and a scaler.
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::{App, Arg};
use vcfmt::caps::{BitDepths, CodecFeatures, HardwareCapability, HardwareInfo, Registry};
use vcfmt::catalog::CodecFamily;
use vcfmt::config::EngineConfig;
use vcfmt::geometry::{ScaleConfig, ScaleFormat, TileMode};
use vcfmt::session::{ResolvedFormat, Session};
use vcfmt::{Format, FormatKind, PixelFormat, QueueDirection, SessionRole};

fn hardware_profile() -> HardwareInfo {
    let hdr = HardwareCapability {
        max_width: 8192,
        max_height: 4352,
        bit_depths: BitDepths::DEPTH_8 | BitDepths::DEPTH_10,
        features: CodecFeatures::LOOP_FILTER | CodecFeatures::TILING,
        ..Default::default()
    };
    let jpeg = HardwareCapability {
        min_width: 16,
        max_width: 16384,
        min_height: 16,
        max_height: 16384,
        width_align: 8,
        height_align: 8,
        ..Default::default()
    };

    CodecFamily::ALL
        .iter()
        .fold(HardwareInfo::new().with_scaler(), |info, &codec| {
            let caps = match codec {
                CodecFamily::Hevc | CodecFamily::Vp9 => hdr.clone(),
                CodecFamily::Jpeg => jpeg.clone(),
                _ => Default::default(),
            };
            info.with_encoder(codec, caps.clone()).with_decoder(codec, caps)
        })
}

fn parse_fourcc(s: &str) -> anyhow::Result<PixelFormat> {
    let fourcc = <[u8; 4]>::try_from(s.as_bytes())
        .map_err(|_| anyhow!("{:?} is not a 4-character code", s))?;
    Ok(PixelFormat::from(&fourcc))
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once('x')
        .ok_or_else(|| anyhow!("{:?} is not of the form WIDTHxHEIGHT", s))?;
    Ok((
        w.parse().context("invalid width")?,
        h.parse().context("invalid height")?,
    ))
}

fn print_format(direction: QueueDirection, resolved: &ResolvedFormat) {
    let format = &resolved.format;
    println!(
        "{}: {} {}x{}, crop {}, {} bits{}",
        direction,
        format.pixelformat,
        format.width,
        format.height,
        resolved.crop,
        resolved.bit_depth,
        if resolved.overflow { " (saturated)" } else { "" }
    );
    for (i, plane) in format.plane_fmt.iter().enumerate() {
        println!(
            "  plane {}: {} bytes, {} bytes per line",
            i, plane.sizeimage, plane.bytesperline
        );
    }
    if let Some(aux) = &resolved.aux {
        for (i, plane) in aux.planes.iter().enumerate() {
            println!(
                "  scaled plane {}: {} bytes, {} bytes per line",
                i, plane.sizeimage, plane.bytesperline
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = App::new("vcfmt format probe")
        .arg(
            Arg::with_name("role")
                .required(true)
                .possible_values(["encoder", "decoder"])
                .help("Role of the session to open"),
        )
        .arg(
            Arg::with_name("codec")
                .long("codec")
                .takes_value(true)
                .default_value("H264")
                .help("Fourcc of the bitstream format"),
        )
        .arg(
            Arg::with_name("raw")
                .long("raw")
                .takes_value(true)
                .default_value("NV12")
                .help("Fourcc of the raw frame format"),
        )
        .arg(
            Arg::with_name("size")
                .long("size")
                .takes_value(true)
                .default_value("1920x1080")
                .help("Requested frame size"),
        )
        .arg(
            Arg::with_name("buffers")
                .long("buffers")
                .takes_value(true)
                .default_value("4")
                .help("Number of buffers to request on each queue"),
        )
        .arg(
            Arg::with_name("tile_32x8")
                .long("tile_32x8")
                .help("Use 32x8 blocks for block-compressed formats"),
        )
        .arg(
            Arg::with_name("scale")
                .long("scale")
                .takes_value(true)
                .help("Enable the scaled output at this size (decoder only)"),
        )
        .get_matches();

    let role = match matches.value_of("role") {
        Some("decoder") => SessionRole::Decoder,
        _ => SessionRole::Encoder,
    };
    let codec = parse_fourcc(matches.value_of("codec").unwrap_or("H264"))?;
    let raw = parse_fourcc(matches.value_of("raw").unwrap_or("NV12"))?;
    let (width, height) = parse_size(matches.value_of("size").unwrap_or("1920x1080"))?;
    let buffers: u32 = matches
        .value_of("buffers")
        .unwrap_or("4")
        .parse()
        .context("invalid number of buffers")?;

    let registry = Arc::new(Registry::with_info(hardware_profile()));
    let mut session = Session::open(registry, role, EngineConfig::new())?;

    if matches.is_present("tile_32x8") {
        session.set_tile_mode(TileMode::Blocks32x8)?;
    }

    // The codec is selected first, as it decides what the raw queue accepts.
    let coded_dir = role.direction_of(FormatKind::Coded);
    let raw_dir = role.direction_of(FormatKind::Raw);
    for (direction, pixelformat) in [(coded_dir, codec), (raw_dir, raw)] {
        let requested = Format::from((pixelformat, (width as usize, height as usize)));
        session
            .set_format(direction, &requested)
            .with_context(|| format!("cannot set {} on the {} queue", pixelformat, direction))?;
    }

    if let Some(size) = matches.value_of("scale") {
        let (width, height) = parse_size(size)?;
        session.set_scaler(Some(ScaleConfig {
            width,
            height,
            format: ScaleFormat::Interleaved,
        }))?;
    }

    for direction in [QueueDirection::Output, QueueDirection::Capture] {
        print_format(direction, &session.get_format(direction)?);
        let config = session.buffer_config(direction, buffers)?;
        println!("  {} buffers", config.count);
    }

    let range = session.query_frame_size_range(codec)?;
    println!(
        "{} frame sizes: {}x{} to {}x{}, step {}x{}",
        codec,
        range.min_width,
        range.min_height,
        range.max_width,
        range.max_height,
        range.step_width,
        range.step_height
    );

    Ok(())
}
