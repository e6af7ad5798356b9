//! Parser del formato texto de nube de puntos.
//!
//! Formato (generado por los scripts de conversión y predicción):
//! ```text
//! nodenumber     x-coordinate     y-coordinate     z-coordinate  [...]
//!          1    1.0000000000E-03   ...
//! ```
//! La línea 0 es cabecera y se descarta. Cada línea siguiente se tokeniza
//! buscando literales numéricos; las filas con menos de 4 números se omiten
//! (son esperables en archivos truncados). El orden de salida es el orden de
//! entrada: magnitudes y colores se emparejan con los puntos por posición.
use serde::{Deserialize, Serialize};

/// Tokens mínimos para aceptar una fila como punto (nodo + x, y, z).
pub const MIN_POINT_TOKENS: usize = 4;
/// Tokens mínimos para leer una magnitud de la fila.
pub const MIN_MAGNITUDE_TOKENS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Motivo por el que una línea no produjo punto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Blank,
    TooFewTokens { found: usize },
    NonFiniteCoordinate,
}

/// Resultado de interpretar una línea de datos.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRow {
    Point { line: usize, point: Point3, magnitude: Option<f64> },
    Skipped { line: usize, reason: SkipReason },
}

/// Nube de puntos parseada.
///
/// Invariante: si `magnitudes` es `Some`, su longitud es igual a la de
/// `points`. Una entrada `None` indica que la fila no traía valor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloudRecord {
    pub points: Vec<Point3>,
    pub magnitudes: Option<Vec<Option<f64>>>,
    /// Líneas de datos descartadas (no incluye la cabecera).
    pub skipped_lines: usize,
}

impl PointCloudRecord {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Magnitud del punto `idx` (None si no hay canal o la fila no la traía).
    pub fn magnitude(&self, idx: usize) -> Option<f64> {
        self.magnitudes.as_ref().and_then(|m| m.get(idx).copied().flatten())
    }
}

/// Parser tolerante de nubes de puntos en texto.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointCloudRecordParser {
    magnitude_column: Option<usize>,
}

impl PointCloudRecordParser {
    pub fn new(magnitude_column: Option<usize>) -> Self {
        Self { magnitude_column }
    }

    /// Atajo: `PointCloudRecordParser::new(column).parse(text)`.
    pub fn parse_text(text: &str, magnitude_column: Option<usize>) -> PointCloudRecord {
        Self::new(magnitude_column).parse(text)
    }

    /// Recorre las líneas de datos (sin cabecera) produciendo una fila
    /// etiquetada por línea. `line` es el índice dentro del texto recortado.
    pub fn rows<'a>(&'a self, text: &'a str) -> impl Iterator<Item = ParsedRow> + 'a {
        text.trim()
            .lines()
            .enumerate()
            .skip(1)
            .map(move |(line, raw)| self.parse_line(line, raw))
    }

    pub fn parse(&self, text: &str) -> PointCloudRecord {
        let mut points = Vec::new();
        let mut magnitudes = Vec::new();
        let mut skipped_lines = 0;
        for row in self.rows(text) {
            match row {
                ParsedRow::Point { point, magnitude, .. } => {
                    points.push(point);
                    magnitudes.push(magnitude);
                }
                ParsedRow::Skipped { .. } => skipped_lines += 1,
            }
        }
        let magnitudes = self.magnitude_column.map(|_| magnitudes);
        PointCloudRecord { points, magnitudes, skipped_lines }
    }

    fn parse_line(&self, line: usize, raw: &str) -> ParsedRow {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ParsedRow::Skipped { line, reason: SkipReason::Blank };
        }
        let tokens = numeric_tokens(trimmed);
        if tokens.len() < MIN_POINT_TOKENS {
            return ParsedRow::Skipped { line,
                                        reason: SkipReason::TooFewTokens { found: tokens.len() } };
        }
        let point = Point3::new(tokens[1], tokens[2], tokens[3]);
        if !point.is_finite() {
            return ParsedRow::Skipped { line, reason: SkipReason::NonFiniteCoordinate };
        }
        let magnitude = match self.magnitude_column {
            Some(col) if tokens.len() >= MIN_MAGNITUDE_TOKENS => tokens.get(col).copied().filter(|m| m.is_finite()),
            _ => None,
        };
        ParsedRow::Point { line, point, magnitude }
    }
}

/// Extrae los literales numéricos de una línea, en orden.
///
/// Acepta enteros, decimales (`1.`, `.5`) y notación científica (`1.0E-2`),
/// con signo opcional. Cualquier otro carácter actúa como separador.
pub fn numeric_tokens(line: &str) -> Vec<f64> {
    let bytes = line.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match scan_number(bytes, i) {
            Some(end) => {
                // el slice sólo contiene ASCII validado por scan_number
                if let Ok(v) = line[i..end].parse::<f64>() {
                    out.push(v);
                }
                i = end;
            }
            None => i += 1,
        }
    }
    out
}

/// Si en `start` empieza un literal numérico devuelve el índice final.
fn scan_number(b: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if matches!(b.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_digits = count_digits(b, i);
    i += int_digits;
    let mut frac_digits = 0;
    if b.get(i) == Some(&b'.') {
        frac_digits = count_digits(b, i + 1);
        if int_digits > 0 || frac_digits > 0 {
            i += 1 + frac_digits;
        }
    }
    if int_digits == 0 && frac_digits == 0 {
        return None;
    }
    if matches!(b.get(i), Some(b'e' | b'E')) {
        let mut j = i + 1;
        if matches!(b.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_digits = count_digits(b, j);
        if exp_digits > 0 {
            i = j + exp_digits;
        }
    }
    Some(i)
}

fn count_digits(b: &[u8], from: usize) -> usize {
    b.iter().skip(from).take_while(|c| c.is_ascii_digit()).count()
}
