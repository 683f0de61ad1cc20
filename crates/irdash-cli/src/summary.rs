use std::path::Path;

use console::Style;
use irdash_core::pipeline::ReductionSummary;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_reduction_summary(summary: &ReductionSummary, out_dir: &Path) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("DASH Reduction"));
    println!(
        "  {}",
        s.title
            .apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}")
    );
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Root"),
        s.value.apply_to(&summary.root)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(out_dir.display())
    );
    println!();

    println!("  {}", s.header.apply_to("Difference Frames"));
    for (name, sky) in summary.frames.iter().zip(summary.sky_levels.iter()) {
        println!(
            "    {:<14}{}",
            s.label.apply_to(name),
            s.value.apply_to(format!("sky {sky:.4}"))
        );
    }
    println!();

    println!("  {}", s.header.apply_to("Cosmic Rays"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Flagged"),
        s.value.apply_to(summary.cr_flagged)
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Cleared"),
        s.value.apply_to(summary.cr_cleared)
    );
    println!();

    println!("  {}", s.header.apply_to("Association"));
    for member in &summary.asn.members {
        println!(
            "    {:<14}{:?}{}",
            s.label.apply_to(&member.name),
            member.mem_type,
            if member.present { "" } else { " (placeholder)" }
        );
    }
    println!();
}
