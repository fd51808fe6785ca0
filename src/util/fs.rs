// Go's os.FileMode bits, as reported in `Resource.mode`.
const MODE_DIR: u64 = 1 << 31;
const MODE_SYMLINK: u64 = 1 << 27;

/// Renders a Filebrowser `mode` value as `ls -l` style permissions.
pub fn mode_to_symbolic(mode: f64) -> String {
    let bits = if mode.is_finite() && mode > 0.0 {
        mode as u64
    } else {
        0
    };

    let kind = if bits & MODE_DIR != 0 {
        'd'
    } else if bits & MODE_SYMLINK != 0 {
        'l'
    } else {
        '-'
    };

    let mut symbolic = String::with_capacity(10);
    symbolic.push(kind);

    // owner, group, others
    for shift in [6, 3, 0] {
        let triplet = (bits >> shift) & 0o7;
        symbolic.push(if triplet & 0o4 != 0 { 'r' } else { '-' });
        symbolic.push(if triplet & 0o2 != 0 { 'w' } else { '-' });
        symbolic.push(if triplet & 0o1 != 0 { 'x' } else { '-' });
    }

    symbolic
}

pub fn format_size(size: f64) -> String {
    const UNITS: [&str; 5] = ["B", "K", "M", "G", "T"];

    let mut value = if size.is_finite() && size > 0.0 { size } else { 0.0 };
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{}{}", value as u64, UNITS[unit])
    } else {
        format!("{:.1}{}", value, UNITS[unit])
    }
}
