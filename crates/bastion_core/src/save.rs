//! Save records for in-flight activated capabilities.
//!
//! Each activation serializes to a discriminated, line-oriented,
//! comment-tagged text record: the capability name, then one value per
//! line. Restoration replays `apply` against the live model and then
//! overwrites the progress counter, temporarily rewinding the asset id
//! allocator so assets recreated by `apply` (buildings under
//! construction, trainees) reuse their saved ids.
//!
//! Whole-model snapshots use bincode via [`GameModel::serialize`]; this
//! format exists for the save-file data contract.

use std::io::{BufRead, Write};

use crate::activated::ActivatedCapability;
use crate::asset::AssetId;
use crate::asset_type::PlayerColor;
use crate::capability::{self, CapabilityId, Target};
use crate::error::{GameError, Result};
use crate::game::GameModel;
use crate::position::PixelPosition;

/// Write every in-flight activation, in ascending actor id order.
pub fn save_activated(model: &GameModel, writer: &mut dyn Write) -> Result<()> {
    let mut records = Vec::new();
    for id in model.arena().sorted_ids() {
        let Some(asset) = model.asset(id) else {
            continue;
        };
        if let Some(activated) = asset.current_command().and_then(|c| c.activated.as_ref()) {
            records.push((id, activated.clone()));
        }
    }

    writeln!(writer, "# Activated Capabilities")?;
    writeln!(writer, "{}", records.len())?;
    for (owner, activated) in records {
        write_record(writer, owner, &activated, model)?;
    }
    Ok(())
}

fn write_record(
    writer: &mut dyn Write,
    owner: AssetId,
    activated: &ActivatedCapability,
    model: &GameModel,
) -> Result<()> {
    let actor = activated.actor();
    let color = model
        .asset(actor)
        .map_or(PlayerColor::None, |asset| asset.color);
    let target = activated.target();
    let target_position = target
        .and_then(|id| model.asset(id))
        .map_or(PixelPosition::default(), |asset| asset.position);
    let cost = activated.committed_cost();

    writeln!(writer, "# Capability")?;
    writeln!(writer, "{}", activated.capability().name())?;
    writeln!(writer, "# Actor")?;
    writeln!(writer, "{actor}")?;
    writeln!(writer, "# Owner")?;
    writeln!(writer, "{owner}")?;
    writeln!(writer, "# Color")?;
    writeln!(writer, "{}", color.name())?;
    writeln!(writer, "# Target")?;
    writeln!(writer, "{}", target.unwrap_or(0))?;
    writeln!(writer, "# Target X")?;
    writeln!(writer, "{}", target_position.x)?;
    writeln!(writer, "# Target Y")?;
    writeln!(writer, "{}", target_position.y)?;
    writeln!(writer, "# Step")?;
    writeln!(writer, "{}", activated.step())?;
    writeln!(writer, "# Gold")?;
    writeln!(writer, "{}", cost.gold)?;
    writeln!(writer, "# Lumber")?;
    writeln!(writer, "{}", cost.lumber)?;
    writeln!(writer, "# Stone")?;
    writeln!(writer, "{}", cost.stone)?;
    Ok(())
}

/// Restore every saved activation into the model by replaying `apply` and
/// overwriting progress.
pub fn restore_activated(model: &mut GameModel, reader: &mut dyn BufRead) -> Result<()> {
    let mut lines = TagReader::new(reader)?;
    let count: usize = lines.next_parsed()?;
    for _ in 0..count {
        restore_record(model, &mut lines)?;
    }
    Ok(())
}

fn restore_record(model: &mut GameModel, lines: &mut TagReader) -> Result<()> {
    let name = lines.next_value()?;
    let capability_id = CapabilityId::from_name(&name)
        .ok_or_else(|| GameError::UnknownCapability(name.clone()))?;
    let actor: AssetId = lines.next_parsed()?;
    let _owner: AssetId = lines.next_parsed()?;
    let color_name = lines.next_value()?;
    let color = PlayerColor::from_name(&color_name).ok_or_else(|| GameError::SaveFormat {
        line: lines.line,
        message: format!("unknown color '{color_name}'"),
    })?;
    let target_id: AssetId = lines.next_parsed()?;
    let target_x: i32 = lines.next_parsed()?;
    let target_y: i32 = lines.next_parsed()?;
    let step: u32 = lines.next_parsed()?;
    let gold: i32 = lines.next_parsed()?;
    let lumber: i32 = lines.next_parsed()?;
    let stone: i32 = lines.next_parsed()?;

    let capability =
        capability::registry()
            .find(capability_id)
            .ok_or(GameError::UnknownCapability(name))?;

    // Rebuild the target. A missing target asset is recreated under its
    // saved id - a terrain marker for basic orders, or the asset `apply`
    // itself constructs (building, trainee).
    let location = PixelPosition::new(target_x, target_y);
    let target = if target_id == 0 {
        Target::NONE
    } else if model.asset(target_id).is_some() {
        Target::asset(target_id, location)
    } else if matches!(
        capability_id,
        CapabilityId::Move
            | CapabilityId::Mine
            | CapabilityId::Patrol
            | CapabilityId::Convey
            | CapabilityId::Attack
            | CapabilityId::Repair
            | CapabilityId::Shelter
    ) {
        let previous = model.arena_rewind(target_id);
        let marker = model.create_marker(location);
        model.arena_restore_counter(previous);
        Target::asset(marker, location)
    } else {
        // Build/train targets are created by apply under the rewound id.
        Target::terrain(location)
    };

    // The saved ledger already reflects the deduction. Return the
    // committed cost first so the replayed apply can deduct it again,
    // netting to exactly the saved values.
    let committed = crate::asset_type::ResourceCost::new(gold, lumber, stone);
    model.player_mut(color).refund(committed);

    let previous = model.arena_rewind(target_id.max(1));
    let applied = capability.apply(model, actor, &target);
    model.arena_restore_counter(previous);
    if !applied {
        model.player_mut(color).spend(committed);
        return Err(GameError::CapabilityRefused {
            capability: capability.name().to_string(),
            actor,
        });
    }

    // Overwrite progress in the stored activation: on the actor for most
    // capabilities, on the built structure for constructions.
    for holder in [actor, target_id] {
        let taken = model
            .asset_mut(holder)
            .and_then(|asset| asset.current_command_mut())
            .and_then(|command| command.activated.take());
        if let Some(mut activated) = taken {
            activated.restore_step(step, model);
            if let Some(command) = model
                .asset_mut(holder)
                .and_then(|asset| asset.current_command_mut())
            {
                command.activated = Some(activated);
            }
            break;
        }
    }
    Ok(())
}

/// Line reader that skips `#` comment tags and blank lines.
struct TagReader {
    values: Vec<String>,
    cursor: usize,
    line: usize,
}

impl TagReader {
    fn new(reader: &mut dyn BufRead) -> Result<Self> {
        let mut values = Vec::new();
        let mut buffer = String::new();
        loop {
            buffer.clear();
            if reader.read_line(&mut buffer)? == 0 {
                break;
            }
            let trimmed = buffer.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            values.push(trimmed.to_string());
        }
        Ok(Self {
            values,
            cursor: 0,
            line: 0,
        })
    }

    fn next_value(&mut self) -> Result<String> {
        let value = self
            .values
            .get(self.cursor)
            .cloned()
            .ok_or(GameError::SaveFormat {
                line: self.cursor,
                message: "unexpected end of save stream".to_string(),
            })?;
        self.cursor += 1;
        self.line = self.cursor;
        Ok(value)
    }

    fn next_parsed<T: std::str::FromStr>(&mut self) -> Result<T> {
        let value = self.next_value()?;
        value.parse().map_err(|_| GameError::SaveFormat {
            line: self.line,
            message: format!("cannot parse '{value}'"),
        })
    }
}
