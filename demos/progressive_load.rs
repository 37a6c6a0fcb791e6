//! Progressive loading demo
//!
//! Simulates a client session: register critical and important assets,
//! drain the phases while a subscriber prints smoothed progress, then move
//! the player so the prefetcher promotes nearby props.

use std::time::Duration;

use glam::Vec3;
use loadphase::{
    AssetKind, AssetLoadTask, ConnectionClass, DeviceClass, LoadingConfig, LoadingContext,
    LoadingPhase, PrefetchZone,
};
use tokio::time::sleep;

fn fake_fetch(id: &str, millis: u64) -> AssetLoadTask {
    let delay = Duration::from_millis(millis);
    AssetLoadTask::new(id, AssetKind::Model, move || async move {
        sleep(delay).await;
        anyhow::Ok(())
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::init();

    let ctx = LoadingContext::new(LoadingConfig::for_device(
        DeviceClass::Desktop,
        ConnectionClass::Typical,
    ));

    ctx.phases().subscribe(|status| {
        println!(
            "[{:>10}] phase {:5.1}%  overall {:5.1}%",
            status.phase.to_string(),
            status.progress,
            status.overall_progress
        );
    });
    ctx.phases().on_phase_complete(LoadingPhase::Critical, || {
        println!(">>> world is playable, loading screen fading out");
    });

    // Critical: the world can't start without these
    ctx.loader().add_asset(fake_fetch("terrain", 120).critical());
    ctx.loader().add_asset(fake_fetch("player_model", 80).critical());
    ctx.loader().add_asset(fake_fetch("skybox", 60).critical());

    // Important: should arrive shortly after entry
    ctx.loader().add_asset(fake_fetch("npc_pack", 90).with_priority(5));
    ctx.loader().add_asset(fake_fetch("ui_icons", 30).with_priority(8));

    // Spatial props the prefetcher may promote later
    ctx.loader().add_asset(
        fake_fetch("harbor_crane", 70)
            .in_phase(LoadingPhase::Background)
            .at_position(Vec3::new(180.0, 0.0, 0.0))
            .with_load_radius(60.0),
    );
    ctx.prefetcher().register_zone(PrefetchZone::new(
        "harbor",
        Vec3::new(180.0, 0.0, 0.0),
        90.0,
        5,
    ));

    ctx.loader().load_phase(LoadingPhase::Critical).await;
    println!("can_enter_world: {}", ctx.phases().can_enter_world());

    ctx.loader().load_phase(LoadingPhase::Important).await;

    // Player sprints toward the harbor; dead reckoning promotes the crane
    ctx.prefetcher()
        .update_player_position(Vec3::new(60.0, 0.0, 0.0), Some(Vec3::new(50.0, 0.0, 0.0)));
    sleep(Duration::from_millis(300)).await;
    println!(
        "harbor_crane loaded early: {}",
        ctx.loader().is_loaded("harbor_crane")
    );

    ctx.loader().load_phase(LoadingPhase::Background).await;

    // Let the progress bar animation settle
    sleep(Duration::from_secs(2)).await;
    let status = ctx.phases().status();
    println!(
        "session complete: {} (overall {:.0}%)",
        status.is_complete, status.overall_progress
    );
}
