use std::env;
use std::fs;
use std::time::Duration;

use tracing::{error, info, Level};

use sigfox_transceiver::device::TracingEcho;
use sigfox_transceiver::util::{init_logging, stop};
use sigfox_transceiver::{
    Config, MessageCodec, Rc1692, Result, SerialPortChannel, SystemClock, Transceiver, Wssfm10,
};

const USAGE: &str = "usage: send_message <serial port> <wisol|radiocrafts> [config.json]";

fn load_config(path: Option<&String>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&text)
        .map_err(|e| sigfox_transceiver::Error::config(format!("{}: {}", path, e)))?;
    Ok(config)
}

fn open(port: &str, model: &str, config: Config) -> Result<Box<dyn Transceiver>> {
    let channel = SerialPortChannel::new(port);
    match model {
        "wisol" => Ok(Box::new(Wssfm10::new(channel, SystemClock, config)?)),
        "radiocrafts" => Ok(Box::new(Rc1692::new(channel, SystemClock, config)?)),
        other => Err(sigfox_transceiver::Error::config(format!("unknown module {:?}", other))),
    }
}

/// Counter plus the module's own temperature and voltage
fn build_message(msg: &mut MessageCodec, transceiver: &mut dyn Transceiver, counter: i32) -> Result<()> {
    msg.add_field("ctr", counter)?;
    msg.add_field("tmp", transceiver.get_temperature()?)?;
    msg.add_field("vlt", transceiver.get_voltage()?)?;
    Ok(())
}

fn main() {
    let _ = init_logging(Level::DEBUG);

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let config = match load_config(args.get(3)) {
        Ok(config) => config,
        Err(e) => {
            error!("Bad configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Country {} uses zone {}", config.country, config.country.zone());

    let mut transceiver = match open(&args[1], &args[2], config) {
        Ok(transceiver) => transceiver,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = transceiver.begin() {
        stop(&TracingEcho, &format!("Unable to init Sigfox module: {}", e));
    }

    let mut counter = 0;
    loop {
        counter += 1;
        let mut msg = MessageCodec::new();
        if let Err(e) = build_message(&mut msg, transceiver.as_mut(), counter) {
            error!("Unable to build message: {}", e);
        }

        match msg.send(transceiver.as_mut()) {
            Ok(()) => info!("Sent {} ({})", msg.encode(), MessageCodec::decode(msg.encode())),
            Err(e) if e.is_fatal() => stop(&TracingEcho, &e.to_string()),
            Err(e) => error!("Send failed: {}", e),
        }

        std::thread::sleep(Duration::from_secs(10 * 60));
    }
}
