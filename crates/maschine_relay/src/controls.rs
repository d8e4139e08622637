use num_derive::FromPrimitive;

pub const BUTTON_COUNT: usize = 41;
/// Buttons before `EncoderPress` have an LED.
pub const LIT_BUTTON_COUNT: usize = 39;

/// Buttons of the Mikro MK3, in HID report bit order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum Buttons {
    Maschine = 0,
    Star,
    Browse,
    Volume,
    Swing,
    Tempo,
    Plugin,
    Sampling,
    Left,
    Right,
    Pitch,
    Mod,
    Perform,
    Notes,
    Group,
    Auto,
    Lock,
    NoteRepeat,
    Restart,
    Erase,
    Tap,
    Follow,
    Play,
    Rec,
    Stop,
    Shift,
    FixedVel,
    PadMode,
    Keyboard,
    Chords,
    Step,
    Scene,
    Pattern,
    Events,
    Variation,
    Duplicate,
    Select,
    Solo,
    Mute,
    EncoderPress,
    EncoderTouch,
}

impl Buttons {
    pub fn from_index(idx: usize) -> Option<Self> {
        num::FromPrimitive::from_usize(idx)
    }

    pub fn all() -> impl Iterator<Item = Buttons> {
        (0..BUTTON_COUNT).filter_map(Self::from_index)
    }

    pub fn has_light(self) -> bool {
        (self as usize) < LIT_BUTTON_COUNT
    }

    /// Name used in OSC addresses.
    pub fn name(self) -> &'static str {
        match self {
            Buttons::Maschine => "maschine",
            Buttons::Star => "star",
            Buttons::Browse => "browse",
            Buttons::Volume => "volume",
            Buttons::Swing => "swing",
            Buttons::Tempo => "tempo",
            Buttons::Plugin => "plugin",
            Buttons::Sampling => "sampling",
            Buttons::Left => "left",
            Buttons::Right => "right",
            Buttons::Pitch => "pitch",
            Buttons::Mod => "mod",
            Buttons::Perform => "perform",
            Buttons::Notes => "notes",
            Buttons::Group => "group",
            Buttons::Auto => "auto",
            Buttons::Lock => "lock",
            Buttons::NoteRepeat => "note_repeat",
            Buttons::Restart => "restart",
            Buttons::Erase => "erase",
            Buttons::Tap => "tap",
            Buttons::Follow => "follow",
            Buttons::Play => "play",
            Buttons::Rec => "rec",
            Buttons::Stop => "stop",
            Buttons::Shift => "shift",
            Buttons::FixedVel => "fixed_vel",
            Buttons::PadMode => "pad_mode",
            Buttons::Keyboard => "keyboard",
            Buttons::Chords => "chords",
            Buttons::Step => "step",
            Buttons::Scene => "scene",
            Buttons::Pattern => "pattern",
            Buttons::Events => "events",
            Buttons::Variation => "variation",
            Buttons::Duplicate => "duplicate",
            Buttons::Select => "select",
            Buttons::Solo => "solo",
            Buttons::Mute => "mute",
            Buttons::EncoderPress => "encoder_press",
            Buttons::EncoderTouch => "encoder_touch",
        }
    }
}
