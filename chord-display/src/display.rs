//! Terminal rendering of the accepted chord in large block letters,
//! the way a small dedicated screen across the room expects it.

use std::collections::BTreeMap;
use std::io::{Write, stdout};

use chord_core::ChordUpdate;
use once_cell::sync::Lazy;

/// Rows per glyph.
const GLYPH_ROWS: usize = 5;

/// Block-letter glyphs for every character a chord label can contain
/// (roots A-G, sharp, minor suffix) plus the no-chord dash.
static GLYPHS: Lazy<BTreeMap<char, [&'static str; GLYPH_ROWS]>> = Lazy::new(|| {
    let mut glyphs = BTreeMap::new();
    glyphs.insert('A', [" ███  ", "█   █ ", "█████ ", "█   █ ", "█   █ "]);
    glyphs.insert('B', ["████  ", "█   █ ", "████  ", "█   █ ", "████  "]);
    glyphs.insert('C', [" ████ ", "█     ", "█     ", "█     ", " ████ "]);
    glyphs.insert('D', ["████  ", "█   █ ", "█   █ ", "█   █ ", "████  "]);
    glyphs.insert('E', ["█████ ", "█     ", "████  ", "█     ", "█████ "]);
    glyphs.insert('F', ["█████ ", "█     ", "████  ", "█     ", "█     "]);
    glyphs.insert('G', [" ████ ", "█     ", "█  ██ ", "█   █ ", " ███  "]);
    glyphs.insert('#', [" █ █  ", "█████ ", " █ █  ", "█████ ", " █ █  "]);
    glyphs.insert('m', ["      ", "      ", "██ █  ", "█ █ █ ", "█ █ █ "]);
    glyphs.insert('—', ["      ", "      ", "█████ ", "      ", "      "]);
    glyphs
});

fn clear_screen() {
    // ANSI clear + cursor home; stderr logging stays out of the way.
    print!("\x1b[2J\x1b[H");
}

/// Renders one update full-screen: the label in block letters, the
/// confidence underneath, and the quit hint.
pub fn render(update: &ChordUpdate) {
    let text = match update.label {
        Some(label) => label.to_string(),
        None => "—".to_string(),
    };

    clear_screen();
    println!("\n\n");
    println!("          {}", "=".repeat(40));
    println!();
    for row in 0..GLYPH_ROWS {
        let line: String = text
            .chars()
            .filter_map(|c| GLYPHS.get(&c).map(|g| g[row]))
            .collect::<Vec<_>>()
            .join("  ");
        println!("               {line}");
    }
    println!();
    if update.label.is_some() {
        println!("               confidence {:.2}", update.confidence);
    } else {
        println!("               (no chord)");
    }
    println!();
    println!("          {}", "=".repeat(40));
    println!("\n               [press q + Enter to quit]");
    let _ = stdout().flush();
}

/// Shown once at startup, before the first update arrives.
pub fn render_waiting(backend: &str, sample_rate: u32) {
    clear_screen();
    println!("\n\n");
    println!("          {}", "=".repeat(40));
    println!();
    println!("               listening ({backend}, {sample_rate} Hz)...");
    println!();
    println!("          {}", "=".repeat(40));
    println!("\n               [press q + Enter to quit]");
    let _ = stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chord_core::{ChordLabel, ChordQuality};

    #[test]
    fn every_chord_label_has_glyphs() {
        for root in 0..12u8 {
            for quality in [ChordQuality::Major, ChordQuality::Minor] {
                let label = ChordLabel::new(root, quality).to_string();
                for c in label.chars() {
                    assert!(GLYPHS.contains_key(&c), "missing glyph for {c:?} in {label}");
                }
            }
        }
        assert!(GLYPHS.contains_key(&'—'));
    }

    #[test]
    fn glyphs_are_uniform_height() {
        for (c, glyph) in GLYPHS.iter() {
            assert_eq!(glyph.len(), GLYPH_ROWS, "glyph {c:?}");
        }
    }
}
