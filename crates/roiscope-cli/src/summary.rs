use std::path::Path;

use console::Style;
use roiscope_core::catalog::ItemCatalog;
use roiscope_core::config::SessionConfig;
use roiscope_core::frame::FrameMetadata;
use roiscope_core::session::SessionOutput;
use roiscope_core::statistics::{ImageStatistics, QualityMetrics};
use roiscope_core::trace::Trace;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

fn print_title(s: &Styles, title: &str) {
    println!();
    println!("  {}", s.title.apply_to(title));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(title.chars().count())));
    println!();
}

fn format_bytes(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b >= KIB * KIB {
        format!("{:.1} MB", b / (KIB * KIB))
    } else if b >= KIB {
        format!("{:.1} KB", b / KIB)
    } else {
        format!("{} B", bytes)
    }
}

pub fn print_scan_summary(dir: &Path, catalog: &ItemCatalog) {
    let s = Styles::new();
    print_title(&s, "Items");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Directory"),
        s.path.apply_to(dir.display())
    );
    let items = catalog.available_items();
    println!(
        "  {:<14}{}",
        s.label.apply_to("Count"),
        s.value.apply_to(items.len())
    );
    println!();

    println!("  {:>6}  {:<16}{:<8}{:>10}  {}", "Item", "Shape", "Dtype", "Size", "File");
    println!("  {}", "-".repeat(60));
    for item in items {
        match catalog.metadata(item) {
            Some(meta) => println!(
                "  {:>6}  {:<16}{:<8}{:>10}  {}",
                item,
                format!("{:?}", meta.shape),
                meta.dtype,
                format_bytes(meta.byte_size),
                meta.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            ),
            None => println!("  {:>6}  {}", item, s.disabled.apply_to("failed to load")),
        }
    }
    println!();
}

pub fn print_statistics_summary(
    item: u32,
    meta: Option<&FrameMetadata>,
    stats: &ImageStatistics,
    quality: &QualityMetrics,
) {
    let s = Styles::new();
    print_title(&s, &format!("Item {item}"));

    if let Some(meta) = meta {
        println!(
            "  {:<14}{}",
            s.label.apply_to("File"),
            s.path.apply_to(meta.path.display())
        );
        println!(
            "  {:<14}{}",
            s.label.apply_to("Dtype"),
            s.value.apply_to(&meta.dtype)
        );
        println!(
            "  {:<14}{}",
            s.label.apply_to("Size"),
            s.value.apply_to(format_bytes(meta.byte_size))
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Shape"),
        s.value.apply_to(format!("{:?}", stats.dimensions))
    );
    println!();

    println!("  {}", s.header.apply_to("Statistics"));
    let rows = [
        ("Mean", stats.mean),
        ("Std", stats.std),
        ("Min", stats.min),
        ("Max", stats.max),
        ("Median", stats.median),
        ("Mode", stats.mode),
        ("Variance", stats.variance),
        ("Range", stats.range),
        ("Skewness", stats.skewness),
        ("Kurtosis", stats.kurtosis),
        ("Entropy", stats.entropy),
    ];
    for (label, value) in rows {
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.value.apply_to(format!("{:.6}", value))
        );
    }
    println!();

    if !stats.per_channel.is_empty() {
        println!("  {}", s.header.apply_to("Channels"));
        println!(
            "    {:>3}  {:>12}{:>12}{:>12}{:>12}{:>12}",
            "#", "Mean", "Std", "Min", "Max", "Median"
        );
        for (i, ch) in stats.per_channel.iter().enumerate() {
            println!(
                "    {:>3}  {:>12.4}{:>12.4}{:>12.4}{:>12.4}{:>12.4}",
                i, ch.mean, ch.std, ch.min, ch.max, ch.median
            );
        }
        println!();
    }

    println!("  {}", s.header.apply_to("Quality"));
    let rows = [
        ("Brightness", quality.brightness),
        ("Contrast", quality.contrast),
        ("Sharpness", quality.sharpness),
        ("Noise", quality.noise_estimate),
    ];
    for (label, value) in rows {
        println!(
            "    {:<12}{}",
            s.label.apply_to(label),
            s.value.apply_to(format!("{:.6}", value))
        );
    }
    println!();
}

pub fn print_session_summary(config: &SessionConfig, output: &SessionOutput) {
    let s = Styles::new();
    print_title(&s, "ROI Session");

    println!(
        "  {:<14}{}",
        s.label.apply_to("Directory"),
        s.path.apply_to(config.directory.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Frames"),
        s.value.apply_to(output.items.len())
    );
    println!();

    println!("  {}", s.header.apply_to("ROIs"));
    for roi in &output.rois {
        println!(
            "    {:<16}{:<12}{}",
            s.value.apply_to(&roi.label),
            roi.kind.to_string(),
            s.label.apply_to(roi.color)
        );
    }
    println!();

    let traces: Vec<&Trace> = output
        .traces
        .iter()
        .chain(&output.averages)
        .chain(&output.derived)
        .collect();
    println!("  {}", s.header.apply_to("Traces"));
    let mut header = format!("    {:>6}", "Frame");
    for trace in &traces {
        header.push_str(&format!("{:>16}", trace.name));
    }
    println!("{}", header);
    println!("    {}", "-".repeat(6 + 16 * traces.len()));
    for &frame in &output.items {
        let mut line = format!("    {:>6}", frame);
        for trace in &traces {
            match trace.get(frame) {
                Some(v) => line.push_str(&format!("{:>16.4}", v)),
                None => line.push_str(&format!("{:>16}", "-")),
            }
        }
        println!("{}", line);
    }
    println!();

    if !output.skipped.is_empty() {
        println!("  {}", s.header.apply_to("Skipped"));
        for skipped in &output.skipped {
            println!(
                "    {:<16}{}",
                s.value.apply_to(&skipped.name),
                s.disabled.apply_to(&skipped.reason)
            );
        }
        println!();
    }
}
