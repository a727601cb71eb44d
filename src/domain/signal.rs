use serde::{Deserialize, Serialize};

use super::counts::VehicleCount;

/// Identificador de cada cúmulo semafórico (dos accesos enfrentados).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cluster {
    A,
    B,
}

impl Cluster {
    /// Identificador externo usado por la API (1 = A, 2 = B).
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Cluster::A),
            2 => Some(Cluster::B),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightColor {
    Green,
    Yellow,
    Red,
}

/// Temporización vigente de un cúmulo, visible desde la API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterTiming {
    pub green_secs: i64,
    pub yellow_secs: i64,
    pub red_secs: i64,
    /// Último conteo aplicado a este acceso, si ha llegado alguno.
    pub vehicles: Option<u32>,
}

/// Ajustes manuales y modo, escritos por la API y leídos una única vez por
/// arranque de ciclo. Con `reset_active` el controlador ignora los ajustes
/// y la heurística y mantiene los valores base.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverrideState {
    pub manual_delta_a: i64,
    pub manual_delta_b: i64,
    pub reset_active: bool,
}

/// Política de temporización: valores base y constantes de la heurística,
/// con nombre para poder ensayar variantes sin redefinir el comportamiento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalPolicy {
    pub base_green_secs: i64,
    pub base_yellow_secs: i64,
    pub base_red_secs: i64,
    /// Umbral de congestión θ, en vehículos por acceso.
    pub congestion_threshold: u32,
    /// Paso fijo del ajuste, en segundos.
    pub adjust_step_secs: i64,
    /// Suelo de cualquier fase recortada por la heurística.
    pub min_phase_secs: i64,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            base_green_secs: 17,
            base_yellow_secs: 3,
            base_red_secs: 20,
            congestion_threshold: 10,
            adjust_step_secs: 3,
            min_phase_secs: 2,
        }
    }
}

/// Duraciones congeladas para un ciclo completo de cuatro fases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    pub a: ClusterTiming,
    pub b: ClusterTiming,
}

/// Transacción de arranque de ciclo: parte de los valores base, funde los
/// ajustes manuales y después la heurística por conteo de vehículos. El
/// resultado queda congelado para las cuatro fases del ciclo.
pub fn plan_cycle(
    policy: &SignalPolicy,
    overrides: &OverrideState,
    counts: Option<VehicleCount>,
) -> CyclePlan {
    let mut a = ClusterTiming {
        green_secs: policy.base_green_secs,
        yellow_secs: policy.base_yellow_secs,
        red_secs: policy.base_red_secs,
        vehicles: counts.map(|c| c.approach_a),
    };
    let mut b = ClusterTiming {
        green_secs: policy.base_green_secs,
        yellow_secs: policy.base_yellow_secs,
        red_secs: policy.base_red_secs,
        vehicles: counts.map(|c| c.approach_b),
    };

    if !overrides.reset_active {
        // Un delta sobre el verde de un cúmulo alarga el rojo del contrario.
        a.green_secs += overrides.manual_delta_a;
        b.red_secs += overrides.manual_delta_a;
        b.green_secs += overrides.manual_delta_b;
        a.red_secs += overrides.manual_delta_b;

        if let Some(c) = counts {
            adjust_for_traffic(policy, &mut a, &mut b, c);
        }
    }

    CyclePlan { a, b }
}

/// Heurística de paso fijo: el acceso congestionado gana `adjust_step_secs`
/// de verde y pierde otro tanto de rojo (con suelo `min_phase_secs`); el
/// contrario cede simétricamente. Con ambos por encima del umbral gana el
/// de conteo estrictamente mayor; en empate no hay cambio.
fn adjust_for_traffic(
    policy: &SignalPolicy,
    a: &mut ClusterTiming,
    b: &mut ClusterTiming,
    counts: VehicleCount,
) {
    let threshold = policy.congestion_threshold;
    let (va, vb) = (counts.approach_a, counts.approach_b);

    let favor_a = va > threshold && (vb <= threshold || va > vb);
    let favor_b = vb > threshold && (va <= threshold || vb > va);

    let step = policy.adjust_step_secs;
    let floor = policy.min_phase_secs;

    if favor_a {
        a.green_secs += step;
        a.red_secs = floor.max(a.red_secs - step);
        b.green_secs = floor.max(b.green_secs - step);
        b.red_secs += step;
    } else if favor_b {
        b.green_secs += step;
        b.red_secs = floor.max(b.red_secs - step);
        a.green_secs = floor.max(a.green_secs - step);
        a.red_secs += step;
    }
}
