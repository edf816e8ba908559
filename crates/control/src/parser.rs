//! Command Grammar
//!
//! One text line in, one [`Command`] out. Keyword commands match exactly;
//! parameterised commands are `name=` prefixes carrying the rest of the
//! line verbatim (argument cleanup is each handler's business). `hostFile=`
//! is deliberately absent: it is a transport-level continuation, not a
//! dispatchable command, so on the console it falls through to `Unknown`.

/// A parsed command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Adc,
    Ip,
    GainGet,
    GainSet(&'a str),
    Wifi(&'a str),
    Start(&'a str),
    Stop,
    Delete(&'a str),
    Files,
    CheckRecording,
    InitSd,
    DeinitSd,
    Unknown,
}

/// Parse one request line. Surrounding whitespace is ignored; anything
/// that matches no form is [`Command::Unknown`].
pub fn parse(raw: &str) -> Command<'_> {
    let line = raw.trim();
    match line {
        "adc" => Command::Adc,
        "ip" => Command::Ip,
        "adsGain" => Command::GainGet,
        "stop" => Command::Stop,
        "files" => Command::Files,
        "checkRecording" => Command::CheckRecording,
        "initSD" => Command::InitSd,
        "deinitSD" => Command::DeinitSd,
        _ => {
            if let Some(value) = line.strip_prefix("adsGain=") {
                Command::GainSet(value)
            } else if let Some(args) = line.strip_prefix("wifi=") {
                Command::Wifi(args)
            } else if let Some(name) = line.strip_prefix("start=") {
                Command::Start(name)
            } else if let Some(name) = line.strip_prefix("delete=") {
                Command::Delete(name)
            } else {
                Command::Unknown
            }
        }
    }
}

/// Fields of a `wifi=<mode>;ssid=<ssid>;pwd=<pwd>` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiArgs<'a> {
    pub mode: &'a str,
    pub ssid: &'a str,
    pub pwd: &'a str,
}

/// Split the argument of a `wifi=` command into its named fields.
///
/// Exactly three `;`-separated fields, the second and third carrying
/// `ssid=` / `pwd=` tags. The password keeps any further semicolons;
/// `None` for anything else.
pub fn parse_wifi(args: &str) -> Option<WifiArgs<'_>> {
    let mut fields = args.splitn(3, ';');
    let mode = fields.next()?;
    let ssid = fields.next()?.strip_prefix("ssid=")?;
    let pwd = fields.next()?.strip_prefix("pwd=")?;
    Some(WifiArgs { mode, ssid, pwd })
}
