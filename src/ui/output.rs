use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn code_changed(code: &str, old: &str, new: &str) {
    println!(
        "  {} {}: {} {} {}",
        Icons::MOD.style(theme().warn.clone()),
        code.style(theme().code.clone()),
        old.style(theme().subtype.clone()),
        Icons::ARROW,
        new
    );
}

pub fn code_removed(code: &str, old: &str) {
    println!(
        "  {} {}: {}",
        Icons::DEL.style(theme().error.clone()),
        code.style(theme().code.clone()),
        old.style(theme().subtype.clone())
    );
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK.style(theme().dim.clone()), elapsed);
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}
