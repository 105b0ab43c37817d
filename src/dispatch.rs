use crate::app::{App, AppError};
use crate::cli::{StatesArgs, StatesSubcommands};
use crate::domain::entity_class::EntityClass;
use crate::domain::state::{State, StateId};
use crate::workflow::StateSetEdit;

pub fn run_states_command(app: &mut App, args: StatesArgs) -> Result<(), AppError> {
    let (class, edit) = match args.command {
        StatesSubcommands::List(list) => {
            let views = app.state_sets()?;
            if list.json {
                crate::print_json(&views);
            } else {
                crate::ui::print_state_sets(&views);
            }
            return Ok(());
        }
        StatesSubcommands::Show(show) => {
            let view = app.state_set(show.class)?;
            if show.json {
                crate::print_json(&view);
            } else {
                crate::ui::print_state_sets(std::slice::from_ref(&view));
            }
            return Ok(());
        }
        StatesSubcommands::Reset(reset) => {
            if app.reset_state_set(reset.class)? {
                println!("{} state set reset to built-in", reset.class);
            } else {
                println!("{} state set was not customized", reset.class);
            }
            return Ok(());
        }
        StatesSubcommands::Add(add) => {
            let mut state = State::new(parse_state_arg(&add.id)?, &add.label);
            state.icon = add.icon;
            state.color = add.color;
            state.is_protected = add.protected;
            (
                add.class,
                StateSetEdit::AddState {
                    state,
                    position: add.position,
                    terminal: add.terminal,
                },
            )
        }
        StatesSubcommands::Remove(target) => (
            target.class,
            StateSetEdit::RemoveState(parse_state_arg(&target.id)?),
        ),
        StatesSubcommands::Default(target) => (
            target.class,
            StateSetEdit::SetDefault(parse_state_arg(&target.id)?),
        ),
        StatesSubcommands::Final(target) => (
            target.class,
            StateSetEdit::SetFinal {
                id: parse_state_arg(&target.id)?,
                terminal: !target.unset,
            },
        ),
        StatesSubcommands::Move(target) => (
            target.class,
            StateSetEdit::MoveState {
                id: parse_state_arg(&target.id)?,
                index: target.index,
            },
        ),
        StatesSubcommands::Reopen(target) => {
            let id = target.id.as_deref().map(parse_state_arg).transpose()?;
            (target.class, StateSetEdit::SetReopen(id))
        }
    };

    apply_edit(app, class, &edit)
}

fn apply_edit(app: &mut App, class: EntityClass, edit: &StateSetEdit) -> Result<(), AppError> {
    app.edit_state_set(class, edit)?;
    let view = app.state_set(class)?;
    crate::ui::print_state_sets(std::slice::from_ref(&view));
    Ok(())
}

fn parse_state_arg(raw: &str) -> Result<StateId, AppError> {
    StateId::parse(raw)
        .ok_or_else(|| AppError::InvalidArgument("state id cannot be empty".to_string()))
}
