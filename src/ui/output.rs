use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().heading.clone()));
}

pub fn info(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().label.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().done.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().caution.clone()));
}

pub fn interrupted(label: &str) {
    eprintln!("{} {}", Icons::STOP, label.style(theme().caution.clone()));
}

pub fn section(title: &str) {
    println!();
    println!(
        "{} {}",
        Icons::GEAR.style(theme().accent.clone()),
        title.style(theme().heading.clone())
    );
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK.style(theme().label.clone()), elapsed);
}
