//! Rampas de color por dominio y metadatos de leyenda.
//!
//! Cada dominio define una secuencia de paradas `(posición, tono)`; el tono
//! se interpola linealmente dentro del segmento que contiene `t` y el color
//! final se obtiene en HSL con saturación 1 y luminosidad 0.5. La leyenda se
//! construye con las mismas paradas que los puntos.
use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Dominio físico del campo escalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldDomain {
    Velocity,
    Pressure,
}

impl FieldDomain {
    pub fn name(self) -> &'static str {
        match self {
            FieldDomain::Velocity => "velocity",
            FieldDomain::Pressure => "pressure",
        }
    }

    /// Columna (índice de token) del campo en el archivo predicho:
    /// `node x y z u v w velocity-magnitude pressure`.
    pub fn column(self) -> usize {
        match self {
            FieldDomain::Velocity => 7,
            FieldDomain::Pressure => 8,
        }
    }
}

impl fmt::Display for FieldDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldDomain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "velocity" => Ok(FieldDomain::Velocity),
            "pressure" => Ok(FieldDomain::Pressure),
            other => Err(DomainError::Validation(format!("dominio de color desconocido: {other}"))),
        }
    }
}

/// Color RGB con componentes en [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// HSL -> RGB con `h`, `s`, `l` en [0, 1].
    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let q = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        Self { r: hue_to_channel(p, q, h + 1.0 / 3.0) as f32,
               g: hue_to_channel(p, q, h) as f32,
               b: hue_to_channel(p, q, h - 1.0 / 3.0) as f32 }
    }
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Color fijo para puntos sin magnitud.
pub const NEUTRAL_COLOR: Rgb = Rgb::new(0.6, 0.6, 0.6);

/// Parada de la rampa: en `position` el tono vale `hue`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RampStop {
    pub position: f64,
    pub hue: f64,
}

const BLUE: f64 = 0.6;
const GREEN: f64 = 0.33;
const YELLOW: f64 = 0.16;
const RED: f64 = 0.0;

const VELOCITY_STOPS: [RampStop; 4] = [RampStop { position: 0.0, hue: BLUE },
                                       RampStop { position: 0.33, hue: GREEN },
                                       RampStop { position: 0.66, hue: YELLOW },
                                       RampStop { position: 1.0, hue: RED }];

const PRESSURE_STOPS: [RampStop; 3] = [RampStop { position: 0.0, hue: BLUE },
                                       RampStop { position: 0.5, hue: GREEN },
                                       RampStop { position: 1.0, hue: RED }];

/// Rampa de tono por tramos de un dominio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorRamp {
    domain: FieldDomain,
    stops: &'static [RampStop],
}

impl ColorRamp {
    pub fn for_domain(domain: FieldDomain) -> Self {
        let stops: &'static [RampStop] = match domain {
            FieldDomain::Velocity => &VELOCITY_STOPS,
            FieldDomain::Pressure => &PRESSURE_STOPS,
        };
        Self { domain, stops }
    }

    pub fn domain(&self) -> FieldDomain {
        self.domain
    }

    pub fn stops(&self) -> &'static [RampStop] {
        self.stops
    }

    /// Tono para `t` (se recorta a [0, 1]).
    pub fn hue_at(&self, t: f64) -> f64 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        for pair in self.stops.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t < b.position {
                let frac = (t - a.position) / (b.position - a.position);
                return a.hue + (b.hue - a.hue) * frac;
            }
        }
        self.stops.last().map_or(RED, |s| s.hue)
    }

    pub fn color_at(&self, t: f64) -> Rgb {
        Rgb::from_hsl(self.hue_at(t), 1.0, 0.5)
    }
}

/// Parada de la barra de leyenda, con su valor físico.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegendStop {
    pub position: f64,
    pub value: f64,
    pub color: Rgb,
}

/// Metadatos para dibujar la barra de gradiente etiquetada.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Legend {
    pub domain: FieldDomain,
    pub min: f64,
    pub max: f64,
    pub min_label: String,
    pub max_label: String,
    pub stops: Vec<LegendStop>,
}

impl Legend {
    fn build(ramp: &ColorRamp, min: f64, max: f64) -> Self {
        let stops = ramp.stops()
                        .iter()
                        .map(|s| LegendStop { position: s.position,
                                              value: min + (max - min) * s.position,
                                              color: Rgb::from_hsl(s.hue, 1.0, 0.5) })
                        .collect();
        Self { domain: ramp.domain(),
               min,
               max,
               min_label: format!("{min:.3}"),
               max_label: format!("{max:.3}"),
               stops }
    }
}

/// Asigna colores a magnitudes escalares según el dominio.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagnitudeColorMapper;

impl MagnitudeColorMapper {
    /// Devuelve un color por entrada (mismo orden) y la leyenda del rango
    /// observado. Las magnitudes ausentes o no finitas no cuentan para el
    /// rango y reciben `NEUTRAL_COLOR`. Sin ninguna magnitud presente no hay
    /// leyenda. Con `max == min` todos los puntos usan `t = 0`.
    pub fn map_to_colors(&self, magnitudes: &[Option<f64>], domain: FieldDomain) -> (Vec<Rgb>, Option<Legend>) {
        let ramp = ColorRamp::for_domain(domain);
        let Some((min, max)) = observed_range(magnitudes) else {
            return (vec![NEUTRAL_COLOR; magnitudes.len()], None);
        };
        let span = max - min;
        let colors = magnitudes.par_iter()
                               .map(|m| match m {
                                   Some(v) if v.is_finite() => {
                                       let t = if span > 0.0 { (v - min) / span } else { 0.0 };
                                       ramp.color_at(t)
                                   }
                                   _ => NEUTRAL_COLOR,
                               })
                               .collect();
        (colors, Some(Legend::build(&ramp, min, max)))
    }
}

fn observed_range(magnitudes: &[Option<f64>]) -> Option<(f64, f64)> {
    magnitudes.iter()
              .filter_map(|m| m.filter(|v| v.is_finite()))
              .fold(None, |acc, v| match acc {
                  None => Some((v, v)),
                  Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
              })
}
