//! Capability-layer rules: initiation gates, application refusals,
//! resource conservation on cancel, and progress reporting.

use bastion_core::capability::registry;
use bastion_core::prelude::*;
use bastion_test_utils::fixtures::{paint, spawn, two_player_model};

fn ledger(model: &GameModel, color: PlayerColor) -> (i32, i32, i32) {
    let player = model.player(color);
    (player.gold(), player.lumber(), player.stone())
}

fn find_asset(model: &GameModel, color: PlayerColor, kind: AssetTypeKind) -> Option<AssetId> {
    model
        .player(color)
        .asset_ids
        .iter()
        .copied()
        .find(|&id| model.asset(id).map(|asset| asset.kind) == Some(kind))
}

/// Take the activation off an asset's current command.
fn take_activation(model: &mut GameModel, id: AssetId) -> ActivatedCapability {
    model
        .asset_mut(id)
        .and_then(|asset| asset.current_command_mut())
        .and_then(|command| command.activated.take())
        .expect("activation present")
}

#[test]
fn test_build_cancel_restores_ledger() {
    let mut model = two_player_model(3);
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 10, 10);
    let before = ledger(&model, PlayerColor::Blue);

    let capability = registry().find(CapabilityId::BuildFarm).unwrap();
    let target = Target::terrain(TilePosition::new(10, 10).center());
    assert!(capability.can_apply(&model, peasant, &target));
    assert!(capability.apply(&mut model, peasant, &target));

    let farm_cost = model.types(PlayerColor::Blue).get(AssetTypeKind::Farm).cost;
    assert_eq!(
        ledger(&model, PlayerColor::Blue),
        (
            before.0 - farm_cost.gold,
            before.1 - farm_cost.lumber,
            before.2 - farm_cost.stone
        )
    );

    let farm = find_asset(&model, PlayerColor::Blue, AssetTypeKind::Farm).unwrap();
    model.cancel_construction(farm);
    assert_eq!(ledger(&model, PlayerColor::Blue), before);
    assert!(model.asset(farm).is_none(), "half-built farm demolished");
    assert_eq!(model.asset(peasant).unwrap().action(), AssetAction::None);
}

#[test]
fn test_train_cancel_restores_ledger() {
    let mut model = two_player_model(5);
    let hall = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::TownHall, 10, 10);
    let before = ledger(&model, PlayerColor::Blue);

    let capability = registry().find(CapabilityId::TrainPeasant).unwrap();
    assert!(capability.apply(&mut model, hall, &Target::NONE));
    assert_ne!(ledger(&model, PlayerColor::Blue), before);

    let mut activation = take_activation(&mut model, hall);
    activation.cancel(&mut model);
    // Cancel must be idempotent-safe: a second cancel refunds nothing.
    activation.cancel(&mut model);
    assert_eq!(ledger(&model, PlayerColor::Blue), before);
    assert!(find_asset(&model, PlayerColor::Blue, AssetTypeKind::Peasant).is_none());
}

#[test]
fn test_research_cancel_restores_bit_and_ledger() {
    let mut model = two_player_model(7);
    let smith = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Blacksmith, 10, 10);
    let before = ledger(&model, PlayerColor::Blue);

    let capability = registry().find(CapabilityId::WeaponUpgrade1).unwrap();
    assert!(capability.can_initiate(&model, smith));
    assert!(capability.apply(&mut model, smith, &Target::NONE));

    // The bit is degraded while researching, so no second start anywhere.
    assert!(!model
        .types(PlayerColor::Blue)
        .get(AssetTypeKind::Blacksmith)
        .has_capability(CapabilityId::WeaponUpgrade1));
    assert!(!capability.can_initiate(&model, smith));

    let mut activation = take_activation(&mut model, smith);
    activation.cancel(&mut model);
    assert_eq!(ledger(&model, PlayerColor::Blue), before);
    assert!(model
        .types(PlayerColor::Blue)
        .get(AssetTypeKind::Blacksmith)
        .has_capability(CapabilityId::WeaponUpgrade1));
}

#[test]
fn test_research_completion_applies_stat_deltas() {
    let mut model = two_player_model(9);
    let smith = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Blacksmith, 10, 10);
    let base_damage = model
        .types(PlayerColor::Blue)
        .get(AssetTypeKind::Footman)
        .basic_damage;

    let capability = registry().find(CapabilityId::WeaponUpgrade1).unwrap();
    assert!(capability.apply(&mut model, smith, &Target::NONE));

    let mut activation = take_activation(&mut model, smith);
    while !activation.increment_step(&mut model) {}

    assert!(model.player(PlayerColor::Blue).has_upgrade(CapabilityId::WeaponUpgrade1));
    assert_eq!(
        model
            .types(PlayerColor::Blue)
            .get(AssetTypeKind::Footman)
            .basic_damage,
        base_damage + 2
    );
    // Red is untouched: upgrades are per player.
    assert_eq!(
        model
            .types(PlayerColor::Red)
            .get(AssetTypeKind::Footman)
            .basic_damage,
        base_damage
    );
}

#[test]
fn test_tiered_research_requires_prerequisite() {
    let mut model = two_player_model(11);
    let smith = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Blacksmith, 10, 10);

    let tier2 = registry().find(CapabilityId::WeaponUpgrade2).unwrap();
    assert!(!tier2.can_initiate(&model, smith));
    assert!(tier2
        .unmet_requirements(&model, smith)
        .contains("WeaponUpgrade1"));

    model
        .player_mut(PlayerColor::Blue)
        .mark_upgrade(CapabilityId::WeaponUpgrade1);
    assert!(tier2.can_initiate(&model, smith));
}

#[test]
fn test_building_upgrade_cancel_and_complete() {
    let mut model = two_player_model(13);
    let hall = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::TownHall, 10, 10);
    // Keep requires a barracks on the field.
    spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Barracks, 20, 20);
    let before = ledger(&model, PlayerColor::Blue);

    let capability = registry().find(CapabilityId::BuildKeep).unwrap();
    assert!(capability.can_initiate(&model, hall));
    assert!(capability.apply(&mut model, hall, &Target::NONE));

    // Cancel restores kind, ledger and the capability bit.
    let mut activation = take_activation(&mut model, hall);
    activation.cancel(&mut model);
    assert_eq!(ledger(&model, PlayerColor::Blue), before);
    assert_eq!(model.asset(hall).unwrap().kind, AssetTypeKind::TownHall);
    assert!(model
        .types(PlayerColor::Blue)
        .get(AssetTypeKind::TownHall)
        .has_capability(CapabilityId::BuildKeep));

    // Run a fresh upgrade to completion: the hall becomes a keep at full
    // hit points.
    assert!(capability.apply(&mut model, hall, &Target::NONE));
    let mut activation = take_activation(&mut model, hall);
    while !activation.increment_step(&mut model) {}
    let keep = model.asset(hall).unwrap();
    assert_eq!(keep.kind, AssetTypeKind::Keep);
    assert_eq!(
        keep.hit_points,
        model.types(PlayerColor::Blue).get(AssetTypeKind::Keep).hit_points
    );
}

#[test]
fn test_percent_complete_monotone_and_exact() {
    let mut model = two_player_model(15);
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 10, 10);

    let capability = registry().find(CapabilityId::BuildFarm).unwrap();
    let target = Target::terrain(TilePosition::new(10, 10).center());
    assert!(capability.apply(&mut model, peasant, &target));

    let farm = find_asset(&model, PlayerColor::Blue, AssetTypeKind::Farm).unwrap();
    let mut activation = take_activation(&mut model, farm);

    let mut last = activation.percent_complete(100);
    assert_eq!(last, 0);
    loop {
        let done = activation.increment_step(&mut model);
        let percent = activation.percent_complete(100);
        assert!(percent >= last, "progress went backwards");
        last = percent;
        if done {
            assert_eq!(percent, 100, "completion must land exactly on max");
            break;
        }
    }
}

#[test]
fn test_attack_rules() {
    let mut model = two_player_model(17);
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 5, 5);
    let footman = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Footman, 6, 5);
    let wall = spawn(&mut model, PlayerColor::Red, AssetTypeKind::Wall, 8, 5);
    let friend = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Footman, 7, 5);
    let enemy = spawn(&mut model, PlayerColor::Red, AssetTypeKind::Footman, 9, 5);

    let attack = registry().find(CapabilityId::Attack).unwrap();
    let at = |model: &GameModel, id: AssetId| model.asset(id).unwrap().position;

    // A peasant may not attack a wall; a footman may.
    let wall_target = Target::asset(wall, at(&model, wall));
    assert!(!attack.can_apply(&model, peasant, &wall_target));
    assert!(attack.can_apply(&model, footman, &wall_target));

    // Same color is never a valid target.
    let friend_target = Target::asset(friend, at(&model, friend));
    assert!(!attack.can_apply(&model, footman, &friend_target));

    // Plain enemies are.
    let enemy_target = Target::asset(enemy, at(&model, enemy));
    assert!(attack.can_apply(&model, footman, &enemy_target));
}

#[test]
fn test_concealed_ranger_cannot_be_targeted() {
    let mut model = two_player_model(19);
    paint(&mut model, TerrainTile::Forest, 10, 4, 2, 4);
    let ranger = spawn(&mut model, PlayerColor::Red, AssetTypeKind::Ranger, 9, 5);
    let footman = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Footman, 7, 5);

    let attack = registry().find(CapabilityId::Attack).unwrap();
    let target = Target::asset(ranger, model.asset(ranger).unwrap().position);

    // Without the scouting research the ranger is a normal target.
    assert!(attack.can_apply(&model, footman, &target));

    model
        .player_mut(PlayerColor::Red)
        .mark_upgrade(CapabilityId::RangerScouting);
    assert!(model.is_concealed(ranger));
    assert!(!attack.can_apply(&model, footman, &target));
}

#[test]
fn test_move_refuses_own_tile() {
    let mut model = two_player_model(21);
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 5, 5);

    let capability = registry().find(CapabilityId::Move).unwrap();
    let own_tile = Target::terrain(TilePosition::new(5, 5).center());
    assert!(!capability.apply(&mut model, peasant, &own_tile));
}

#[test]
fn test_unmet_requirements_message() {
    let mut model = GameModel::new(23, TerrainMap::new(32, 32));
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 5, 5);

    let capability = registry().find(CapabilityId::BuildFarm).unwrap();
    assert!(!capability.can_initiate(&model, peasant));
    let message = capability.unmet_requirements(&model, peasant);
    assert!(message.contains("Lumber:250"), "got '{message}'");
}

#[test]
fn test_gold_mine_requires_vein_and_neutral_ownership() {
    let mut model = two_player_model(25);
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 10, 10);

    let capability = registry().find(CapabilityId::BuildGoldMine).unwrap();
    let target = Target::terrain(TilePosition::new(10, 10).center());

    // No vein under the footprint: the placement is refused.
    assert!(!capability.apply(&mut model, peasant, &target));

    // Over a located vein it builds, owned by the neutral color and
    // pre-seeded with its reserve.
    paint(&mut model, TerrainTile::GoldVein, 11, 11, 1, 1);
    assert!(capability.apply(&mut model, peasant, &target));

    let mine = find_asset(&model, PlayerColor::None, AssetTypeKind::GoldMine).unwrap();
    let mine_asset = model.asset(mine).unwrap();
    assert_eq!(mine_asset.color, PlayerColor::None);
    assert_eq!(
        mine_asset.mine_gold,
        bastion_core::capabilities::build::GOLD_MINE_SEED
    );
}

#[test]
fn test_save_restore_mid_construction() {
    let mut model = two_player_model(27);
    let peasant = spawn(&mut model, PlayerColor::Blue, AssetTypeKind::Peasant, 10, 10);
    let capability = registry().find(CapabilityId::BuildFarm).unwrap();
    let target = Target::terrain(TilePosition::new(10, 10).center());
    assert!(capability.apply(&mut model, peasant, &target));

    // Advance construction partway through.
    for _ in 0..240 {
        model.tick();
    }
    let farm = find_asset(&model, PlayerColor::Blue, AssetTypeKind::Farm).unwrap();
    let saved_hp = model.asset(farm).unwrap().hit_points;
    assert!(saved_hp > 1);

    let mut buffer = Vec::new();
    bastion_core::save::save_activated(&model, &mut buffer).unwrap();

    // Rebuild the world as a save loader would: same assets minus the
    // in-flight construction, ledger as saved.
    let mut restored = two_player_model(27);
    let restored_peasant =
        spawn(&mut restored, PlayerColor::Blue, AssetTypeKind::Peasant, 10, 10);
    assert_eq!(restored_peasant, peasant);
    let farm_cost = restored.types(PlayerColor::Blue).get(AssetTypeKind::Farm).cost;
    restored.player_mut(PlayerColor::Blue).spend(farm_cost);

    let mut reader = std::io::BufReader::new(buffer.as_slice());
    bastion_core::save::restore_activated(&mut restored, &mut reader).unwrap();

    // The farm came back under its saved id with its saved progress.
    let rebuilt = restored.asset(farm).expect("farm recreated under saved id");
    assert_eq!(rebuilt.kind, AssetTypeKind::Farm);
    assert_eq!(rebuilt.hit_points, saved_hp);
    assert_eq!(
        restored.player(PlayerColor::Blue).lumber(),
        model.player(PlayerColor::Blue).lumber()
    );
}
