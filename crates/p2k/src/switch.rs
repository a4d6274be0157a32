//! Switch topology: one output fed from a selectable source.
//!
//! [`Switch::single`] models a plain media switch (output 1, video only).
//! [`Switch::output`] models one output of a multi-output device as an
//! independent switch that tracks its video and audio sources as a pair.

use tracing::debug;

use p2k_core::command::Command;
use p2k_core::error::{Error, Result};
use p2k_core::instruction::Instruction;
use p2k_core::value;

use crate::engine::Engine;
use crate::state::{Fold, Topology};

/// A single-output media switch.
pub type MediaSwitch = Engine<Switch>;

/// One output of a multi-output device, driven as its own switch.
pub type OutputSwitch = Engine<Switch>;

/// Which signals a switch routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signals {
    Video,
    VideoAndAudio,
}

impl Signals {
    fn has_audio(self) -> bool {
        self == Signals::VideoAndAudio
    }
}

/// Selected sources for one output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    output: u8,
    signals: Signals,
    video_source: u8,
    audio_source: u8,
}

impl Switch {
    /// Output 1, video only.
    pub fn single() -> Self {
        Switch {
            output: 1,
            signals: Signals::Video,
            video_source: 0,
            audio_source: 0,
        }
    }

    /// Output `number` (1-based) with video and audio routed together.
    pub fn output(number: i64) -> Result<Self> {
        let output = value::check(number)?;
        if output == 0 {
            return Err(Error::InvalidParameter(
                "output numbers start at 1".into(),
            ));
        }
        Ok(Switch {
            output,
            signals: Signals::VideoAndAudio,
            video_source: 0,
            audio_source: 0,
        })
    }

    pub fn with_signals(mut self, signals: Signals) -> Self {
        self.signals = signals;
        self
    }

    pub fn output_number(&self) -> u8 {
        self.output
    }

    pub fn signals(&self) -> Signals {
        self.signals
    }

    pub fn video_source(&self) -> u8 {
        self.video_source
    }

    /// `None` for a video-only switch.
    pub fn audio_source(&self) -> Option<u8> {
        self.signals.has_audio().then_some(self.audio_source)
    }

    fn query(&self, command: Command, machine_id: u8) -> Result<Instruction> {
        Instruction::new(
            command,
            Some(0),
            Some(i64::from(self.output)),
            Some(i64::from(machine_id)),
        )
    }
}

impl Topology for Switch {
    fn status_queries(&self, machine_id: u8) -> Result<Vec<Instruction>> {
        let mut queries = vec![self.query(Command::QueryOutputStatus, machine_id)?];
        if self.signals.has_audio() {
            queries.push(self.query(Command::QueryAudioOutputStatus, machine_id)?);
        }
        Ok(queries)
    }

    fn apply(&mut self, response: &Instruction) -> Fold {
        let audio = self.signals.has_audio();
        match response.command().command() {
            Some(Command::SwitchVideo) => {
                self.video_source = response.input_value();
                Fold::Applied
            }
            Some(Command::SwitchAudio) if audio => {
                self.audio_source = response.input_value();
                Fold::Applied
            }
            // Status answers carry the routed input in the output field.
            Some(Command::QueryOutputStatus) => {
                self.video_source = response.output_value();
                Fold::Applied
            }
            Some(Command::QueryAudioOutputStatus) if audio => {
                self.audio_source = response.output_value();
                Fold::Applied
            }
            _ => Fold::Ignored,
        }
    }
}

impl Engine<Switch> {
    /// Route `input` to this switch's output.
    ///
    /// `input` is clamped into `[0, input_count]`. The local selection is
    /// updated before the request is sent, then overwritten by whatever the
    /// device answers.
    pub async fn select_source(&mut self, input: i64) -> Result<()> {
        let input = value::clamp_index(input, self.input_count());
        let output = i64::from(self.topology().output);
        debug!(input, output, "selecting source");

        let mut batch = vec![self.instruction(Command::SwitchVideo, input, output)?];
        let has_audio = self.topology().signals.has_audio();
        if has_audio {
            batch.push(self.instruction(Command::SwitchAudio, input, output)?);
        }

        // Clamped into [0, input_count], so it fits a u8.
        let selected = input as u8;
        let topology = self.topology_mut();
        topology.video_source = selected;
        if has_audio {
            topology.audio_source = selected;
        }
        self.exchange(&batch).await
    }

    /// Input currently routed to this output (video).
    pub fn selected_source(&self) -> u8 {
        self.topology().video_source
    }

    /// Input currently routed to this output's audio, if it carries audio.
    pub fn selected_audio_source(&self) -> Option<u8> {
        self.topology().audio_source()
    }

    pub fn output_number(&self) -> u8 {
        self.topology().output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use p2k_core::device::shared;
    use p2k_test_harness::MockDevice;

    fn ins(cmd: Command, input: i64, output: i64) -> Instruction {
        Instruction::new(cmd, Some(input), Some(output), Some(1)).unwrap()
    }

    /// A switch engine that believes it has `inputs` inputs.
    fn engine_with_inputs(mock: MockDevice, topology: Switch, inputs: i64) -> Engine<Switch> {
        let mut engine = Engine::new(shared(mock), 1, topology);
        engine.state_mut().panel.input_count = inputs as u8;
        engine
    }

    #[test]
    fn output_zero_is_rejected() {
        assert!(matches!(Switch::output(0), Err(Error::InvalidParameter(_))));
        assert!(matches!(Switch::output(128), Err(Error::OutOfRange { .. })));
        assert_eq!(Switch::output(3).unwrap().output_number(), 3);
    }

    #[test]
    fn single_switch_queries_output_one() {
        let queries = Switch::single().status_queries(1).unwrap();
        assert_eq!(queries, vec![ins(Command::QueryOutputStatus, 0, 1)]);
    }

    #[test]
    fn output_switch_queries_video_and_audio() {
        let queries = Switch::output(2).unwrap().status_queries(1).unwrap();
        assert_eq!(
            queries,
            vec![
                ins(Command::QueryOutputStatus, 0, 2),
                ins(Command::QueryAudioOutputStatus, 0, 2),
            ]
        );
    }

    #[test]
    fn video_only_switch_ignores_audio() {
        let mut switch = Switch::single();
        assert_eq!(
            switch.apply(&ins(Command::SwitchAudio, 4, 1)),
            Fold::Ignored
        );
        assert_eq!(switch.audio_source(), None);
    }

    #[test]
    fn status_reads_output_field() {
        let mut switch = Switch::output(1).unwrap();
        switch.apply(&ins(Command::QueryOutputStatus, 0, 5));
        switch.apply(&ins(Command::QueryAudioOutputStatus, 0, 6));
        assert_eq!(switch.video_source(), 5);
        assert_eq!(switch.audio_source(), Some(6));
    }

    #[tokio::test]
    async fn select_source_sends_video_switch() {
        let mut mock = MockDevice::new();
        mock.expect(
            vec![ins(Command::SwitchVideo, 3, 1)],
            vec![ins(Command::SwitchVideo, 3, 1)],
        );
        let handle = mock.clone();
        let mut switch = engine_with_inputs(mock, Switch::single(), 8);

        switch.select_source(3).await.unwrap();
        assert_eq!(switch.selected_source(), 3);
        assert_eq!(switch.selected_audio_source(), None);
        assert_eq!(handle.remaining_expectations(), 0);
    }

    #[tokio::test]
    async fn select_source_clamps_to_input_count() {
        let mut mock = MockDevice::new();
        mock.expect(
            vec![ins(Command::SwitchVideo, 8, 1)],
            vec![ins(Command::SwitchVideo, 8, 1)],
        );
        mock.expect(
            vec![ins(Command::SwitchVideo, 0, 1)],
            vec![ins(Command::SwitchVideo, 0, 1)],
        );
        let mut switch = engine_with_inputs(mock, Switch::single(), 8);

        switch.select_source(50).await.unwrap();
        assert_eq!(switch.selected_source(), 8);
        switch.select_source(-4).await.unwrap();
        assert_eq!(switch.selected_source(), 0);
    }

    #[tokio::test]
    async fn output_switch_routes_video_and_audio_in_one_batch() {
        let mut mock = MockDevice::new();
        let batch = vec![
            ins(Command::SwitchVideo, 2, 3),
            ins(Command::SwitchAudio, 2, 3),
        ];
        mock.expect(batch.clone(), batch);
        let handle = mock.clone();
        let mut switch = engine_with_inputs(mock, Switch::output(3).unwrap(), 4);

        switch.select_source(2).await.unwrap();
        assert_eq!(switch.selected_source(), 2);
        assert_eq!(switch.selected_audio_source(), Some(2));
        assert_eq!(handle.processed().len(), 1);
    }

    #[tokio::test]
    async fn failed_select_keeps_optimistic_value() {
        let mut mock = MockDevice::new();
        mock.expect(
            vec![ins(Command::SwitchVideo, 1, 1)],
            vec![ins(Command::SwitchVideo, 1, 1)],
        );
        let mut switch = engine_with_inputs(mock, Switch::single(), 8);

        assert!(switch.select_source(5).await.is_err());
        assert_eq!(switch.selected_source(), 5);
    }

    #[tokio::test]
    async fn refresh_reads_both_signals() {
        let mut mock = MockDevice::new();
        mock.expect(
            vec![
                ins(Command::DefineMachine, 1, 1),
                ins(Command::DefineMachine, 2, 1),
                ins(Command::QueryOutputStatus, 0, 2),
                ins(Command::QueryAudioOutputStatus, 0, 2),
                ins(Command::QueryPanelLock, 0, 0),
            ],
            vec![
                ins(Command::DefineMachine, 1, 4),
                ins(Command::DefineMachine, 2, 4),
                ins(Command::QueryOutputStatus, 0, 1),
                ins(Command::QueryAudioOutputStatus, 0, 3),
                ins(Command::QueryPanelLock, 0, 0),
            ],
        );
        let switch = Engine::connect(shared(mock), 1, Switch::output(2).unwrap())
            .await
            .unwrap();
        assert_eq!(switch.output_number(), 2);
        assert_eq!(switch.selected_source(), 1);
        assert_eq!(switch.selected_audio_source(), Some(3));
        assert_eq!(switch.output_count(), 4);
    }
}
