use colored::*;
use netsift_core::surface::{Notice, NoticeKind, ResultSummary};
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::{colors, format};

pub const TOTAL_WIDTH: usize = 64;
pub const TARGET: &str = "netsift::print";
pub const RAW_FIELD: &str = "raw_msg";

const KEY_WIDTH: usize = 7;

#[macro_export]
macro_rules! mprint {
    () => {
        $crate::terminal::print::print("");
    };
    ($msg:expr) => {
        $crate::terminal::print::print($msg);
    };
}

const BANNER: &str = r#"
                       __         _ ______
          ____  ___  / /_______(_) __/ /_
         / __ \/ _ \/ __/ ___/ / /_/ __/
        / / / /  __/ /_(__  ) / __/ /_
       /_/ /_/\___/\__/____/_/_/  \__/
"#;

pub fn print(msg: &str) {
    info!(target: TARGET, raw_msg = msg);
}

pub fn banner(no_banner: bool) {
    if no_banner {
        return;
    }

    let text_content: String = format!("⟦ NETSIFT v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let text_width: usize = UnicodeWidthStr::width(text_content.as_str());
    let text: ColoredString = text_content.bright_green().bold();
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH.saturating_sub(text_width) / 2).bright_black();

    print(&format!("{}{}{}", sep, text, sep));
    print(&format!("{}", BANNER.green()));
}

pub fn header(msg: &str) {
    let formatted: String = format!("⟦ {} ⟧", msg);
    let msg_len: usize = formatted.chars().count();

    let dash_count: usize = TOTAL_WIDTH.saturating_sub(msg_len);
    let left: usize = dash_count / 2;
    let right: usize = dash_count - left;

    let line: ColoredString = format!(
        "{}{}{}",
        "─".repeat(left),
        formatted.to_uppercase().bright_green(),
        "─".repeat(right)
    )
    .bright_black();

    print(&format!("{}", line));
}

pub fn fat_separator() {
    let sep: ColoredString = "═".repeat(TOTAL_WIDTH).bright_black();
    print(&format!("{}", sep));
}

pub fn print_status<T: AsRef<str>>(msg: T) {
    let prefix: ColoredString = ">".color(colors::SEPARATOR);
    let message: String = format!("{} {}", prefix, msg.as_ref().color(colors::TEXT_DEFAULT));
    print(&message);
}

pub fn tree_head(idx: usize, name: &str) {
    let idx_str: String = format!("[{}]", idx.to_string().color(colors::ACCENT));
    let output: String = format!(
        "{} {}",
        idx_str.color(colors::SEPARATOR),
        name.color(colors::PRIMARY)
    );
    print(&output);
}

fn branch(last: bool) -> ColoredString {
    if last { "└─".bright_black() } else { "├─".bright_black() }
}

pub fn as_tree_one_level(key_value_pair: Vec<(String, ColoredString)>) {
    for (i, (key, value)) in key_value_pair.iter().enumerate() {
        let last: bool = i + 1 == key_value_pair.len();
        let dots: String = ".".repeat(KEY_WIDTH.saturating_sub(key.len()));
        let output: String = format!(
            " {} {}{}{} {}",
            branch(last),
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        );
        print(&output);
    }
}

pub fn as_tree_list(items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        print(&format!(" {} {}", branch(i + 1 == items.len()), item));
    }
}

pub fn centerln(msg: &str) {
    let space = " ".repeat(TOTAL_WIDTH.saturating_sub(console::measure_text_width(msg)) / 2);
    print(&format!("{}{}{}", space, msg, space));
}

pub fn notice(notice: &Notice) {
    let title: ColoredString = match notice.kind {
        NoticeKind::Info => notice.title.bright_blue().bold(),
        NoticeKind::Success => notice.title.bright_green().bold(),
        NoticeKind::Error => notice.title.bright_red().bold(),
    };
    print(&format!("{} {}", "■".color(colors::SEPARATOR), title));
    for line in notice.message.lines() {
        print(&format!("  {}", line.color(colors::TEXT_DEFAULT)));
    }
}

/// Category tree of a finished session.
pub fn categorized(summary: &ResultSummary) {
    header("categorized results");
    for (idx, (category, hosts)) in summary.groups.iter().enumerate() {
        tree_head(idx, &format!("{} ({})", category.label(), hosts.len()));
        let lines: Vec<String> = hosts.iter().map(format::host_line).collect();
        as_tree_list(&lines);
    }

    fat_separator();
    let hosts: ColoredString = format!("{} hosts", summary.host_count()).bold().green();
    let groups: ColoredString = format!("{} categories", summary.groups.len()).bold().yellow();
    centerln(&format!("{hosts} sorted into {groups}"));
    print_status(format!("Hostfiles written to {}", summary.session_dir.display()));
}

const NO_RESULTS: &str = r#"
         _   _  ___    _   _  ___  ____ _____ ____
        | \ | |/ _ \  | | | |/ _ \/ ___|_   _/ ___|
        |  \| | | | | | |_| | | | \___ \ | | \___ \
        | |\  | |_| | |  _  | |_| |___) || |  ___) |
        |_| \_|\___/  |_| |_|\___/|____/ |_| |____/
"#;

pub fn no_results() {
    print(&format!("{}", NO_RESULTS.red().bold()));
}

pub fn end_of_program() {
    print(&format!(
        "{}",
        "═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR)
    ));
}
