use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use framewire::image::{CameraInfo, ImageMetadata};
use framewire::source::ResultBody;
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One line of `grab` output.
#[derive(Debug, Serialize)]
pub struct FrameSummary {
    pub index: u64,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    pub checksum: String,
    pub complete: bool,
}

#[derive(Serialize)]
struct StatusOutput<'a> {
    request: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'a str>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

pub fn print_metadata(metadata: &ImageMetadata, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(metadata),
        OutputFormat::Table => print_table(
            vec!["WIDTH", "HEIGHT", "COLOR SPACE", "LAYOUT", "DATA TYPE", "ORIENTATION", "BYTES"],
            vec![vec![
                metadata.width().to_string(),
                metadata.height().to_string(),
                metadata.color_space().to_string(),
                metadata.layout().to_string(),
                metadata.element_type().to_string(),
                metadata.orientation().to_string(),
                metadata.size_bytes().to_string(),
            ]],
        ),
        OutputFormat::Pretty => {
            println!("Image metadata:");
            println!("  Size:         {}x{}", metadata.width(), metadata.height());
            println!("  Color space:  {}", metadata.color_space());
            println!("  Layout:       {}", metadata.layout());
            println!("  Data type:    {}", metadata.element_type());
            println!("  Orientation:  {}", metadata.orientation());
            println!("  Frame bytes:  {}", metadata.size_bytes());
        }
    }
}

pub fn print_frames(frames: &[FrameSummary], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for frame in frames {
                print_json(frame);
            }
        }
        OutputFormat::Table => print_table(
            vec!["#", "SIZE", "BYTES", "CHECKSUM", "COMPLETE"],
            frames
                .iter()
                .map(|f| {
                    vec![
                        f.index.to_string(),
                        format!("{}x{}", f.width, f.height),
                        f.size_bytes.to_string(),
                        f.checksum.clone(),
                        f.complete.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for f in frames {
                println!(
                    "frame={} size={}x{} bytes={} checksum={}{}",
                    f.index,
                    f.width,
                    f.height,
                    f.size_bytes,
                    f.checksum,
                    if f.complete { "" } else { " (incomplete)" }
                );
            }
        }
    }
}

pub fn print_status(request: &str, detail: Option<&str>, format: OutputFormat) {
    let out = StatusOutput {
        request,
        status: "success",
        detail,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["REQUEST", "STATUS", "DETAIL"],
            vec![vec![
                request.to_string(),
                out.status.to_string(),
                detail.unwrap_or("-").to_string(),
            ]],
        ),
        OutputFormat::Pretty => match detail {
            Some(detail) => println!("{request} {detail}: success"),
            None => println!("{request}: success"),
        },
    }
}

pub fn print_cameras(cameras: &[CameraInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(cameras),
        OutputFormat::Table => print_table(
            vec!["ID", "NAME", "TYPE", "CONNECTION"],
            cameras
                .iter()
                .map(|c| {
                    vec![
                        c.id.clone(),
                        c.display_name.clone(),
                        c.source_type.clone(),
                        c.connection.clone(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            for camera in cameras {
                println!("{camera}");
            }
        }
    }
}

/// Results received by `serve`.
pub fn print_result(body: &ResultBody, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Table => print_json(body),
        OutputFormat::Pretty => println!(
            "result: {}",
            serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string())
        ),
    }
}

/// FNV-1a over the frame bytes, enough to tell frames apart.
pub fn checksum(data: &[u8]) -> String {
    let hash = data.iter().fold(0xcbf2_9ce4_8422_2325u64, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    });
    format!("{hash:016x}")
}
