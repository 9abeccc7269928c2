use crate::{CloseReason, DetailPhase, DetailState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: DetailState, msg: Msg) -> (DetailState, Vec<Effect>) {
    if state.is_terminal() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::SimulationResolved(None) | Msg::SimulationLookupFailed(_) => {
            let mut effects = Vec::with_capacity(2);
            if state.close_stream(CloseReason::NotFound) {
                effects.push(Effect::CloseLogStream);
            }
            state.set_phase(DetailPhase::NotFound);
            effects.push(Effect::NavigateToList);
            effects
        }
        Msg::SimulationResolved(Some(simulation)) => match state.phase() {
            DetailPhase::Loading => {
                let stopped = simulation.state.is_stopped();
                let simulation_id = simulation.id.clone();
                state.set_simulation(simulation);
                state.set_phase(DetailPhase::Active);
                if stopped {
                    Vec::new()
                } else {
                    state.open_stream();
                    vec![Effect::OpenLogStream { simulation_id }]
                }
            }
            DetailPhase::Active => {
                let stopped = simulation.state.is_stopped();
                state.set_simulation(simulation);
                // A stopped view never reopens its stream.
                if stopped && state.close_stream(CloseReason::Stopped) {
                    vec![Effect::CloseLogStream]
                } else {
                    Vec::new()
                }
            }
            DetailPhase::NotFound | DetailPhase::Closed => Vec::new(),
        },
        Msg::LogRecordReceived(record) => {
            if !state.is_stream_open() {
                Vec::new()
            } else if state.is_stopped() {
                // Checked against the state known before this record arrived.
                state.close_stream(CloseReason::Stopped);
                vec![Effect::CloseLogStream]
            } else {
                state.push_record(record);
                Vec::new()
            }
        }
        Msg::LogStreamFailed(message) => {
            state.close_stream(CloseReason::Failed(message));
            Vec::new()
        }
        Msg::LogStreamEnded => {
            state.close_stream(CloseReason::Ended);
            Vec::new()
        }
        Msg::ViewClosed => {
            let effects = if state.close_stream(CloseReason::ViewClosed) {
                vec![Effect::CloseLogStream]
            } else {
                Vec::new()
            };
            state.set_phase(DetailPhase::Closed);
            effects
        }
    };

    (state, effects)
}
