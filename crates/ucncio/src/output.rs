use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use ucncio_bridge::StatusChannel;
use ucncio_wire::{PinId, PinKind, PinRecord, PinUpdate, ID_LIMIT, RESERVED_IDS};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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

fn print_json(value: &impl Serialize) {
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

#[derive(Serialize)]
struct StatusOutput<'a> {
    event: &'static str,
    channel: &'static str,
    status: &'a str,
    timestamp: String,
}

pub fn print_status(channel: StatusChannel, text: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StatusOutput {
            event: "status",
            channel: channel.name(),
            status: text,
            timestamp: now_unix_seconds(),
        }),
        OutputFormat::Table => {
            print_table(vec!["CHANNEL", "STATUS"], vec![vec![channel.to_string(), text.to_string()]]);
        }
        OutputFormat::Pretty => println!("{channel}: {text}"),
        OutputFormat::Raw => print_line(text),
    }
}

#[derive(Serialize)]
struct PinRow {
    id: PinId,
    kind: PinKind,
    index: usize,
}

#[derive(Serialize)]
struct PinMapOutput {
    pins: Vec<PinRow>,
    reserved: [u8; 2],
    id_limit: u8,
}

/// Print every assigned id in id order, plus the reserved gap.
pub fn print_pin_map(format: OutputFormat) {
    let pins: Vec<PinRow> = (0..ID_LIMIT)
        .filter_map(|raw| {
            let id = PinId::new(raw);
            id.resolve().map(|(kind, index)| PinRow { id, kind, index })
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&PinMapOutput {
            pins,
            reserved: [*RESERVED_IDS.start(), *RESERVED_IDS.end()],
            id_limit: ID_LIMIT,
        }),
        OutputFormat::Table => {
            let mut rows: Vec<Vec<String>> = pins
                .iter()
                .map(|pin| {
                    vec![
                        pin.id.get().to_string(),
                        pin.kind.to_string(),
                        pin.index.to_string(),
                    ]
                })
                .collect();
            let reserved_at = rows
                .iter()
                .position(|row| row[0] == (RESERVED_IDS.end() + 1).to_string())
                .unwrap_or(rows.len());
            rows.insert(
                reserved_at,
                vec![
                    format!("{}-{}", RESERVED_IDS.start(), RESERVED_IDS.end()),
                    "reserved".to_string(),
                    "-".to_string(),
                ],
            );
            print_table(vec!["ID", "KIND", "INDEX"], rows);
        }
        OutputFormat::Pretty => {
            for kind in PinKind::ALL {
                let ids: Vec<String> = PinId::all(kind).map(|id| id.get().to_string()).collect();
                println!("{:>8}: {}", kind.name(), ids.join(" "));
            }
            println!(
                "reserved: {}-{}",
                RESERVED_IDS.start(),
                RESERVED_IDS.end()
            );
        }
        OutputFormat::Raw => {
            for pin in &pins {
                print_line(&format!("{} {} {}", pin.id.get(), pin.kind, pin.index));
            }
        }
    }
}

#[derive(Serialize)]
struct ChangeRow {
    id: PinId,
    kind: PinKind,
    value: u8,
}

impl ChangeRow {
    fn from_update(update: PinUpdate) -> Option<Self> {
        let (kind, _) = update.id().resolve()?;
        let value = match update {
            PinUpdate::Digital { on, .. } => u8::from(on),
            PinUpdate::Level { value, .. } => value,
        };
        Some(Self {
            id: update.id(),
            kind,
            value,
        })
    }
}

#[derive(Serialize)]
struct InputReport {
    event: &'static str,
    cycle: u64,
    changes: Vec<ChangeRow>,
}

/// Report panel inputs that differ from the previous reply.
pub fn print_input_changes(cycle: u64, changes: Vec<PinUpdate>, format: OutputFormat) {
    let changes: Vec<ChangeRow> = changes.into_iter().filter_map(ChangeRow::from_update).collect();
    if changes.is_empty() {
        return;
    }

    match format {
        OutputFormat::Json => print_json(&InputReport {
            event: "inputs",
            cycle,
            changes,
        }),
        OutputFormat::Table => print_table(
            vec!["CYCLE", "ID", "KIND", "VALUE"],
            changes
                .iter()
                .map(|c| {
                    vec![
                        cycle.to_string(),
                        c.id.get().to_string(),
                        c.kind.to_string(),
                        c.value.to_string(),
                    ]
                })
                .collect(),
        ),
        OutputFormat::Pretty => {
            let parts: Vec<String> = changes
                .iter()
                .map(|c| format!("{}={}", c.id, c.value))
                .collect();
            println!("cycle {cycle}: {}", parts.join(" "));
        }
        OutputFormat::Raw => {
            for c in &changes {
                print_line(&format!("{cycle} {} {}", c.id.get(), c.value));
            }
        }
    }
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    event: &'static str,
    role: &'a str,
    cycles: u64,
    record: PinRecord,
}

/// Final line of `panel` and `simulate`: cycles completed and the last record seen.
pub fn print_summary(role: &str, cycles: u64, record: &PinRecord, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&SummaryOutput {
            event: "summary",
            role,
            cycles,
            record: *record,
        }),
        OutputFormat::Table => print_table(
            vec!["ROLE", "CYCLES", "OUTPUTS", "INPUTS"],
            vec![vec![
                role.to_string(),
                cycles.to_string(),
                format!("{:#010x}", record.outputs),
                format!("{:#010x}", record.inputs),
            ]],
        ),
        OutputFormat::Pretty => println!(
            "{role}: {cycles} cycles, outputs={:#010x} inputs={:#010x}",
            record.outputs, record.inputs
        ),
        OutputFormat::Raw => print_raw(&ucncio_wire::encode(record)),
    }
}

fn print_line(line: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
