//! Metrics and encoding for the two standard PDF fonts used everywhere
//! (Helvetica and Helvetica-Bold, WinAnsiEncoding). Standard fonts need no
//! embedding, so output does not depend on fonts installed on the host.

/// Resource name of Helvetica in every content stream
pub const FONT_REGULAR: &str = "F1";
/// Resource name of Helvetica-Bold in every content stream
pub const FONT_BOLD: &str = "F2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    pub fn resource(&self) -> &'static str {
        match self {
            Face::Regular => FONT_REGULAR,
            Face::Bold => FONT_BOLD,
        }
    }
}

/// Advance widths (1/1000 em) for ASCII 0x20..=0x7E, from the Adobe AFM files
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width of one glyph in 1/1000 em
pub fn char_width(c: char, face: Face) -> u16 {
    let table = match face {
        Face::Regular => &HELVETICA,
        Face::Bold => &HELVETICA_BOLD,
    };
    match c {
        ' '..='~' => table[c as usize - 0x20],
        // accented Latin-1 letters take the width of their base letter
        'À'..='Å' => table['A' as usize - 0x20],
        'Ç' => table['C' as usize - 0x20],
        'È'..='Ë' => table['E' as usize - 0x20],
        'Ì'..='Ï' => table['I' as usize - 0x20],
        'Ñ' => table['N' as usize - 0x20],
        'Ò'..='Ö' | 'Ø' => table['O' as usize - 0x20],
        'Ù'..='Ü' => table['U' as usize - 0x20],
        'à'..='å' => table['a' as usize - 0x20],
        'ç' => table['c' as usize - 0x20],
        'è'..='ë' => table['e' as usize - 0x20],
        'ì'..='ï' => table['i' as usize - 0x20],
        'ñ' => table['n' as usize - 0x20],
        'ò'..='ö' | 'ø' => table['o' as usize - 0x20],
        'ù'..='ü' => table['u' as usize - 0x20],
        '…' | '—' => 1000,
        _ => 556,
    }
}

/// Rendered width of `text` in points
pub fn text_width(text: &str, size: f32, face: Face) -> f32 {
    text.chars().map(|c| char_width(c, face) as f32).sum::<f32>() * size / 1000.0
}

/// Shorten `text` with a trailing ellipsis until it fits `max_width` points
pub fn fit_to_width(text: &str, max_width: f32, size: f32, face: Face) -> String {
    if text_width(text, size, face) <= max_width {
        return text.to_string();
    }
    let ellipsis = text_width("…", size, face);
    let mut out = String::new();
    let mut width = 0.0;
    for c in text.chars() {
        let w = char_width(c, face) as f32 * size / 1000.0;
        if width + w + ellipsis > max_width {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('…');
    out
}

/// Encode text for a WinAnsiEncoding font. Unmappable characters become '?'.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\t' | '\n' | '\r' => b' ',
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8a,
            '‹' => 0x8b,
            'Œ' => 0x8c,
            'Ž' => 0x8e,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9a,
            '›' => 0x9b,
            'œ' => 0x9c,
            'ž' => 0x9e,
            'Ÿ' => 0x9f,
            _ => b'?',
        })
        .collect()
}
