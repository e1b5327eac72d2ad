//! Startup banner.

use console::Style;

const BANNER: &str = r#"
  _  __ ___  ___  _
 | |/ /| __|| __|| |
 | ' < | _| | _| | |__
 |_|\_\|___||___||____|"#;

/// Print the startup banner, but only to a terminal someone is watching.
pub fn print_banner() {
    if !console::user_attended() {
        return;
    }

    let cyan = Style::new().cyan().bold();
    let dim = Style::new().dim();

    println!("{}", cyan.apply_to(BANNER));
    println!(
        "  {}",
        dim.apply_to(format!(
            "v{}: build, run and ship blockchain apps",
            env!("CARGO_PKG_VERSION")
        ))
    );
    println!();
}
