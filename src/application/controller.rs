use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use crate::application::ports::LightBankPort;
use crate::domain::{
    counts::VehicleCount,
    signal::{plan_cycle, Cluster, ClusterTiming, CyclePlan, LightColor, OverrideState, SignalPolicy},
};

/// Estado compartido entre el bucle de ciclo, el suscriptor de conteos y la
/// API. Un único candado basta: las secciones críticas son cortas y la
/// contención, baja.
struct SignalState {
    timing_a: ClusterTiming,
    timing_b: ClusterTiming,
    overrides: OverrideState,
    latest_counts: Option<VehicleCount>,
}

/// Controlador adaptativo de los dos cúmulos semafóricos. Es el único dueño
/// de la temporización: la API sólo dispone de los métodos guardados de este
/// tipo, sin acceso directo al estado.
pub struct SignalController {
    state: Mutex<SignalState>,
    policy: SignalPolicy,
    lights: Arc<dyn LightBankPort>,
}

impl SignalController {
    pub fn new(policy: SignalPolicy, lights: Arc<dyn LightBankPort>) -> Arc<Self> {
        let baseline = ClusterTiming {
            green_secs: policy.base_green_secs,
            yellow_secs: policy.base_yellow_secs,
            red_secs: policy.base_red_secs,
            vehicles: None,
        };
        Arc::new(Self {
            state: Mutex::new(SignalState {
                timing_a: baseline.clone(),
                timing_b: baseline,
                overrides: OverrideState::default(),
                latest_counts: None,
            }),
            policy,
            lights,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, SignalState> {
        // Cada mutación es una escritura única bajo el candado, así que el
        // estado sigue siendo coherente aunque otro hilo haya entrado en
        // pánico con la guarda tomada.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Instantánea de la temporización vigente para la API.
    pub fn status(&self) -> (ClusterTiming, ClusterTiming) {
        let st = self.lock_state();
        (st.timing_a.clone(), st.timing_b.clone())
    }

    /// Registra un ajuste manual del verde de un cúmulo. Reactiva la vía de
    /// fusión (ajustes + heurística) si estaba suspendida por un reset.
    pub fn manual_adjust(&self, cluster: Cluster, delta_secs: i64) {
        let mut st = self.lock_state();
        match cluster {
            Cluster::A => st.overrides.manual_delta_a = delta_secs,
            Cluster::B => st.overrides.manual_delta_b = delta_secs,
        }
        st.overrides.reset_active = false;
    }

    /// Borra ambos ajustes y mantiene los cúmulos en los valores base hasta
    /// que se reactive el modo automático.
    pub fn manual_reset(&self) {
        let mut st = self.lock_state();
        st.overrides = OverrideState {
            manual_delta_a: 0,
            manual_delta_b: 0,
            reset_active: true,
        };
    }

    /// Reactiva la fusión automática sin tocar los ajustes vigentes.
    pub fn enable_auto(&self) {
        let mut st = self.lock_state();
        st.overrides.reset_active = false;
    }

    /// Vuelca el último conteo del puente en el buzón compartido.
    pub fn update_counts(&self, counts: VehicleCount) {
        let mut st = self.lock_state();
        st.latest_counts = Some(counts);
    }

    /// Transacción de arranque de ciclo: bajo una única adquisición calcula
    /// las duraciones de las cuatro fases y publica la temporización para la
    /// API. Lo que llegue con el ciclo en marcha espera al siguiente
    /// arranque; el plan devuelto ya no depende del estado compartido.
    fn begin_cycle(&self) -> CyclePlan {
        let mut st = self.lock_state();
        let plan = plan_cycle(&self.policy, &st.overrides, st.latest_counts);
        st.timing_a = plan.a.clone();
        st.timing_b = plan.b.clone();
        plan
    }

    /// Bucle de hardware: un ciclo de cuatro fases tras otro, indefinidamente.
    pub async fn run(self: Arc<Self>) {
        loop {
            let plan = self.begin_cycle();
            info!(
                "(CÚMULO A: verde = {}s ; rojo = {}s)",
                plan.a.green_secs, plan.a.red_secs
            );
            info!(
                "(CÚMULO B: verde = {}s ; rojo = {}s)",
                plan.b.green_secs, plan.b.red_secs
            );

            // A verde / B rojo
            self.hold_phase(LightColor::Green, LightColor::Red, plan.a.green_secs)
                .await;
            // A ámbar / B rojo
            self.hold_phase(LightColor::Yellow, LightColor::Red, plan.a.yellow_secs)
                .await;
            // A rojo / B verde
            self.hold_phase(LightColor::Red, LightColor::Green, plan.b.green_secs)
                .await;
            // A rojo / B ámbar
            self.hold_phase(LightColor::Red, LightColor::Yellow, plan.b.yellow_secs)
                .await;
        }
    }

    /// Mantiene una combinación de luces durante `secs` segundos. La guarda
    /// apaga los pines al salir, también si la tarea se cancela a mitad de
    /// fase.
    async fn hold_phase(&self, color_a: LightColor, color_b: LightColor, secs: i64) {
        let _guard = PhaseGuard::assert_pair(self.lights.clone(), color_a, color_b);
        tokio::time::sleep(Duration::from_secs(secs.max(0) as u64)).await;
    }

    /// Tarea de fondo que escucha el puente y actualiza el buzón de conteos,
    /// desacoplada del ritmo del ciclo.
    pub fn spawn_count_listener(self: Arc<Self>, mut rx: watch::Receiver<Option<VehicleCount>>) {
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let latest = *rx.borrow_and_update();
                if let Some(counts) = latest {
                    self.update_counts(counts);
                    info!(
                        "Conteo recibido: A = {}, B = {}",
                        counts.approach_a, counts.approach_b
                    );
                }
            }
        });
    }
}

/// Afirmación con limpieza garantizada de la pareja de luces de una fase.
/// Un fallo de escritura se registra y la fase continúa.
struct PhaseGuard {
    lights: Arc<dyn LightBankPort>,
    pair: [(Cluster, LightColor); 2],
}

impl PhaseGuard {
    fn assert_pair(lights: Arc<dyn LightBankPort>, color_a: LightColor, color_b: LightColor) -> Self {
        let pair = [(Cluster::A, color_a), (Cluster::B, color_b)];
        for (cluster, color) in pair {
            if let Err(e) = lights.set_light(cluster, color, true) {
                warn!("Fallo encendiendo {:?} de {:?}: {}", color, cluster, e);
            }
        }
        Self { lights, pair }
    }
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        for (cluster, color) in self.pair {
            if let Err(e) = self.lights.set_light(cluster, color, false) {
                warn!("Fallo apagando {:?} de {:?}: {}", color, cluster, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::bus::LoopbackVehicleBus;
    use crate::adapters::gpio::SimulatedLightBank;
    use crate::application::ports::VehicleBusPort;

    fn controller() -> Arc<SignalController> {
        SignalController::new(
            SignalPolicy::default(),
            Arc::new(SimulatedLightBank::with_default_pins()),
        )
    }

    fn counts(approach_a: u32, approach_b: u32) -> VehicleCount {
        VehicleCount {
            approach_a,
            approach_b,
        }
    }

    #[test]
    fn test_overrides_apply_only_at_the_next_cycle_start() {
        let c = controller();

        let plan = c.begin_cycle();
        assert_eq!(plan.a.green_secs, 17);

        // escritura con el ciclo "en marcha": el plan congelado y el estado
        // publicado no cambian
        c.manual_adjust(Cluster::A, 5);
        let (a, _) = c.status();
        assert_eq!(a.green_secs, 17);
        assert_eq!(plan.a.green_secs, 17);

        let next = c.begin_cycle();
        assert_eq!(next.a.green_secs, 22);
        assert_eq!(next.b.red_secs, 25);
        let (a, b) = c.status();
        assert_eq!(a.green_secs, 22);
        assert_eq!(b.red_secs, 25);
    }

    #[test]
    fn test_count_updates_apply_only_at_the_next_cycle_start() {
        let c = controller();
        c.update_counts(counts(11, 0));
        let plan = c.begin_cycle();
        assert_eq!(plan.a.green_secs, 20);

        c.update_counts(counts(0, 30));
        assert_eq!(c.status().0.green_secs, 20);

        let next = c.begin_cycle();
        assert_eq!(next.b.green_secs, 20);
        assert_eq!(next.a.green_secs, 14);
    }

    #[test]
    fn test_manual_reset_restores_baseline_and_suspends_the_heuristic() {
        let c = controller();
        c.manual_adjust(Cluster::A, 5);
        c.update_counts(counts(30, 0));
        let adjusted = c.begin_cycle();
        assert_eq!(adjusted.a.green_secs, 25); // 17 + 5 + 3

        c.manual_reset();
        let plan = c.begin_cycle();
        assert_eq!(plan.a.green_secs, 17);
        assert_eq!(plan.a.yellow_secs, 3);
        assert_eq!(plan.a.red_secs, 20);
        assert_eq!(plan.b.green_secs, 17);
        // el conteo se sigue reportando aunque no se aplique
        assert_eq!(plan.a.vehicles, Some(30));
    }

    #[test]
    fn test_enable_auto_resumes_the_heuristic_after_a_reset() {
        let c = controller();
        c.manual_reset();
        c.update_counts(counts(15, 0));
        assert_eq!(c.begin_cycle().a.green_secs, 17);

        c.enable_auto();
        assert_eq!(c.begin_cycle().a.green_secs, 20);
    }

    #[test]
    fn test_sustained_congestion_extends_green_at_every_cycle_start() {
        let c = controller();
        c.update_counts(counts(11, 5));
        for _ in 0..3 {
            let plan = c.begin_cycle();
            assert_eq!(plan.a.green_secs, 20);
            assert_eq!(plan.a.red_secs, 17);
            assert_eq!(plan.b.green_secs, 14);
            assert_eq!(plan.b.red_secs, 23);
            assert!(plan.a.red_secs >= 2 && plan.b.green_secs >= 2);
        }
    }

    #[test]
    fn test_phase_guard_clears_both_lights_on_drop() {
        let bank = Arc::new(SimulatedLightBank::with_default_pins());
        let guard = PhaseGuard::assert_pair(bank.clone(), LightColor::Green, LightColor::Red);

        assert!(bank.is_on(Cluster::A, LightColor::Green));
        assert!(bank.is_on(Cluster::B, LightColor::Red));
        assert!(!bank.is_on(Cluster::A, LightColor::Red));

        drop(guard);
        for cluster in [Cluster::A, Cluster::B] {
            for color in [LightColor::Green, LightColor::Yellow, LightColor::Red] {
                assert!(!bank.is_on(cluster, color));
            }
        }
    }

    #[tokio::test]
    async fn test_count_listener_feeds_the_shared_mailbox() {
        let c = controller();
        let bus = LoopbackVehicleBus::new("smart_traffic/vehicles");
        c.clone().spawn_count_listener(bus.subscribe().await.unwrap());

        bus.publish(counts(7, 12)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let plan = c.begin_cycle();
        assert_eq!(plan.a.vehicles, Some(7));
        assert_eq!(plan.b.vehicles, Some(12));
    }
}
