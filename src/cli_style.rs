use clap::builder::styling::{AnsiColor, Color, Style};
use clap::builder::Styles;
use crossterm::style::{Attribute, Color as CtColor, Stylize};
use unicode_width::UnicodeWidthStr;

// ═══════════════════════════════════════════════════════════════════════════════
// Clap Styles
// ═══════════════════════════════════════════════════════════════════════════════

fn ansi(color: AnsiColor) -> Style {
    Style::new().bold().fg_color(Some(Color::Ansi(color)))
}

pub fn get_styles() -> Styles {
    Styles::styled()
        .usage(ansi(AnsiColor::Cyan).underline())
        .header(ansi(AnsiColor::Cyan).underline())
        .literal(ansi(AnsiColor::Green))
        .valid(ansi(AnsiColor::Green))
        .invalid(ansi(AnsiColor::Red))
        .error(ansi(AnsiColor::Red))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Color Palette
// ═══════════════════════════════════════════════════════════════════════════════

pub mod colors {
    use crossterm::style::Color;

    const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb { r, g, b }
    }

    pub const CYAN: Color = rgb(0, 255, 255);
    pub const MAGENTA: Color = rgb(255, 0, 255);
    pub const PURPLE: Color = rgb(180, 100, 255);
    pub const PINK: Color = rgb(255, 105, 180);
    pub const GREEN: Color = rgb(0, 255, 136);
    pub const ORANGE: Color = rgb(255, 165, 0);
    pub const RED: Color = rgb(255, 85, 85);
    pub const DIM: Color = rgb(128, 128, 128);
    pub const WHITE: Color = rgb(255, 255, 255);
}

// ═══════════════════════════════════════════════════════════════════════════════
// Box Drawing Characters
// ═══════════════════════════════════════════════════════════════════════════════

pub mod box_chars {
    pub const SINGLE_HORIZONTAL: &str = "─";
    pub const SINGLE_VERTICAL: &str = "│";

    // Rounded box
    pub const ROUND_TOP_LEFT: &str = "╭";
    pub const ROUND_TOP_RIGHT: &str = "╮";
    pub const ROUND_BOTTOM_LEFT: &str = "╰";
    pub const ROUND_BOTTOM_RIGHT: &str = "╯";

    // T-junctions
    pub const T_LEFT: &str = "├";
    pub const T_RIGHT: &str = "┤";
    pub const T_TOP: &str = "┬";
    pub const T_BOTTOM: &str = "┴";
    pub const CROSS: &str = "┼";

    // Bullets and bars
    pub const BULLET: &str = "●";
    pub const BULLET_EMPTY: &str = "○";
    pub const DIAMOND: &str = "◆";
    pub const CHECK: &str = "✓";
    pub const CROSS_MARK: &str = "✗";
    pub const BAR: &str = "█";
}

// ═══════════════════════════════════════════════════════════════════════════════
// Banner
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_banner() {
    let banner = r#"
  ████████╗███████╗██╗     ███████╗███╗   ███╗███████╗████████╗██████╗ ██╗   ██╗
  ╚══██╔══╝██╔════╝██║     ██╔════╝████╗ ████║██╔════╝╚══██╔══╝██╔══██╗╚██╗ ██╔╝
     ██║   █████╗  ██║     █████╗  ██╔████╔██║█████╗     ██║   ██████╔╝ ╚████╔╝
     ██║   ██╔══╝  ██║     ██╔══╝  ██║╚██╔╝██║██╔══╝     ██║   ██╔══██╗  ╚██╔╝
     ██║   ███████╗███████╗███████╗██║ ╚═╝ ██║███████╗   ██║   ██║  ██║   ██║
     ╚═╝   ╚══════╝╚══════╝╚══════╝╚═╝     ╚═╝╚══════╝   ╚═╝   ╚═╝  ╚═╝   ╚═╝
"#;

    // Print with gradient effect
    let gradient_colors = [
        colors::CYAN,
        colors::CYAN,
        colors::PURPLE,
        colors::PURPLE,
        colors::MAGENTA,
        colors::MAGENTA,
        colors::PINK,
    ];

    for (i, line) in banner.lines().enumerate() {
        let color = gradient_colors.get(i).unwrap_or(&colors::CYAN);
        println!("{}", line.with(*color).bold());
    }

    let subtitle = format!(
        "  ═══════════════════  PLAYLIST TELEMETRY {}  ═══════════════════",
        env!("APP_VERSION")
    );
    println!("{}", subtitle.with(colors::DIM));
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Status Indicators
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_success(message: &str) {
    println!(
        " {} {}",
        box_chars::CHECK.to_string().with(colors::GREEN).bold(),
        message.with(colors::GREEN)
    );
}

pub fn print_error(message: &str) {
    eprintln!(
        " {} {}",
        box_chars::CROSS_MARK.to_string().with(colors::RED).bold(),
        message.with(colors::RED)
    );
}

pub fn print_warning(message: &str) {
    println!(
        " {} {}",
        "⚠".with(colors::ORANGE).bold(),
        message.with(colors::ORANGE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Section Headers
// ═══════════════════════════════════════════════════════════════════════════════

const SECTION_WIDTH: usize = 60;

/// `╭── Title ──╮`, centred in [`SECTION_WIDTH`] cells.
pub fn print_section_header(title: &str) {
    let fill = SECTION_WIDTH.saturating_sub(title.width() + 4);
    let left = box_chars::SINGLE_HORIZONTAL.repeat(fill / 2);
    let right = box_chars::SINGLE_HORIZONTAL.repeat(fill - fill / 2);

    println!();
    println!(
        "{}{} {} {}{}",
        box_chars::ROUND_TOP_LEFT.with(colors::CYAN),
        left.with(colors::CYAN),
        title.with(colors::CYAN).bold().attribute(Attribute::Italic),
        right.with(colors::CYAN),
        box_chars::ROUND_TOP_RIGHT.with(colors::CYAN)
    );
}

pub fn print_section_footer() {
    let line = format!(
        "{}{}{}",
        box_chars::ROUND_BOTTOM_LEFT,
        box_chars::SINGLE_HORIZONTAL.repeat(SECTION_WIDTH),
        box_chars::ROUND_BOTTOM_RIGHT
    );
    println!("{}", line.with(colors::CYAN));
    println!();
}

// ═══════════════════════════════════════════════════════════════════════════════
// Key-Value Display
// ═══════════════════════════════════════════════════════════════════════════════

pub fn print_key_value(key: &str, value: &str) {
    println!(
        "  {} {} {}",
        box_chars::BULLET.with(colors::PURPLE),
        format!("{}:", key).with(colors::DIM),
        value.with(colors::WHITE)
    );
}

pub fn print_key_value_highlight(key: &str, value: &str, color: CtColor) {
    println!(
        "  {} {} {}",
        box_chars::DIAMOND.with(colors::MAGENTA),
        format!("{}:", key).with(colors::CYAN).bold(),
        value.with(color).bold()
    );
}

pub fn print_empty_list(message: &str) {
    println!(
        "  {} {}",
        box_chars::BULLET_EMPTY.with(colors::DIM),
        message.with(colors::DIM).attribute(Attribute::Italic)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Bar Charts
// ═══════════════════════════════════════════════════════════════════════════════

const BAR_WIDTH: usize = 30;

/// Length of a bar for `value` when `max` fills [`BAR_WIDTH`] cells.
pub fn bar_length(value: usize, max: usize) -> usize {
    if max == 0 {
        return 0;
    }
    let scaled = (value * BAR_WIDTH + max - 1) / max;
    scaled.min(BAR_WIDTH)
}

pub fn print_bar(label: &str, label_width: usize, value: usize, max: usize, color: CtColor) {
    let padding = label_width.saturating_sub(label.width());
    println!(
        "  {}{} {} {}",
        label.with(colors::DIM),
        " ".repeat(padding),
        box_chars::BAR.repeat(bar_length(value, max)).with(color),
        value.to_string().with(colors::WHITE)
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// Table Display
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TableBuilder {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl TableBuilder {
    pub fn new(headers: Vec<&str>) -> Self {
        let col_widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
        TableBuilder {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.col_widths.len() {
                self.col_widths[i] = self.col_widths[i].max(cell.width());
            }
        }
        self.rows.push(row);
    }

    pub fn col_widths(&self) -> &[usize] {
        &self.col_widths
    }

    fn border(&self, left: &str, junction: &str, right: &str) -> String {
        let segments: Vec<String> = self
            .col_widths
            .iter()
            .map(|width| box_chars::SINGLE_HORIZONTAL.repeat(width + 2))
            .collect();
        format!("{}{}{}", left, segments.join(junction), right)
    }

    fn print_line<S: AsRef<str>>(&self, cells: &[S], color: CtColor, bold: bool) {
        let bar = box_chars::SINGLE_VERTICAL.with(colors::CYAN);
        print!("{}", bar);
        for (i, width) in self.col_widths.iter().enumerate() {
            let cell = cells.get(i).map(|c| c.as_ref()).unwrap_or("");
            let padded = format!("{}{}", cell, " ".repeat(width.saturating_sub(cell.width())));
            let styled = if bold {
                padded.with(color).bold()
            } else {
                padded.with(color)
            };
            print!(" {} {}", styled, bar);
        }
        println!();
    }

    pub fn print(&self) {
        if self.col_widths.is_empty() {
            return;
        }
        let top = self.border(
            box_chars::ROUND_TOP_LEFT,
            box_chars::T_TOP,
            box_chars::ROUND_TOP_RIGHT,
        );
        let separator = self.border(box_chars::T_LEFT, box_chars::CROSS, box_chars::T_RIGHT);
        let bottom = self.border(
            box_chars::ROUND_BOTTOM_LEFT,
            box_chars::T_BOTTOM,
            box_chars::ROUND_BOTTOM_RIGHT,
        );

        println!("{}", top.with(colors::CYAN));
        self.print_line(&self.headers, colors::CYAN, true);
        println!("{}", separator.with(colors::CYAN));
        for row in &self.rows {
            self.print_line(row, colors::WHITE, false);
        }
        println!("{}", bottom.with(colors::CYAN));
    }
}

/// Cut `text` to at most `max_width` display columns, marking the cut.
pub fn truncate(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    let mut out = String::new();
    for c in text.chars() {
        let candidate = format!("{}{}…", out, c);
        if candidate.width() > max_width {
            break;
        }
        out.push(c);
    }
    out.push('…');
    out
}
