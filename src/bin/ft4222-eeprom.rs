#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate ft4222_eeprom;
use ft4222_eeprom::*;

use std::process::exit;
use std::time::Duration;

use ft4222_eeprom::config::{
	I2cConfig,
	MicrowireConfig,
	SlaveConfig,
};
use ft4222_eeprom::i2c::PagedWriter;
use ft4222_eeprom::microwire::SerialEepromDriver;
use ft4222_eeprom::sim::{
	I2cEepromSim,
	MicrowireEepromSim,
	SlaveFeedSim,
};
use ft4222_eeprom::spi_slave::{
	SlaveFrameReceiver,
	slave_transfer_checksum,
	uppercase,
};

const SLOGAN1: &[u8] = b"FTDI Chip strives to Make Design Easy with our modules, cables and integrated circuits for USB connectivity and display systems.";
const SLOGAN2: &[u8] = b"FT4222H: Hi-Speed USB 2.0 QSPI/I2C device controller.  QFN32, 1.8/2.5/3.3V IO, 128 bytes OTP.  Requires 12 MHz external crystal.";

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

// so every run changes the content: pick whichever slogan isn't stored yet
fn pick_slogan(current: &[u8]) -> Vec<u8> {
	let mut slogan = SLOGAN1.to_vec();
	slogan.resize(current.len(), b' ');
	if slogan[..] == current[..] {
		slogan = SLOGAN2.to_vec();
		slogan.resize(current.len(), b' ');
	}
	slogan
}

fn hexdump(title: &str, data: &[u8]) {
	println!("{} ({} bytes):", title, data.len());
	for (line, chunk) in data.chunks(16).enumerate() {
		print!("{:04x} ", line * 16);
		for (i, b) in chunk.iter().enumerate() {
			if 8 == i {
				print!(" ");
			}
			print!(" {:02x}", b);
		}
		for i in chunk.len()..16 {
			if 8 == i {
				print!(" ");
			}
			print!("   ");
		}
		let text: String = chunk.iter().map(|&b| {
			if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' }
		}).collect();
		println!("  |{}|", text);
	}
}

fn i2c(sub_m: &clap::ArgMatches) -> AResult<()> {
	let config = I2cConfig {
		ack_retries: get_param(sub_m, "retries")?,
		..Default::default()
	};
	let cycle: u32 = get_param(sub_m, "cycle")?;
	let slave = config.slave_address;

	let mut bus = I2cEepromSim::new(slave, config.device_size, config.page_size).with_write_cycle(cycle);
	let writer = PagedWriter::from_config(&config);

	let mut original = vec![0u8; config.device_size];
	writer.read_all(&mut bus, slave, &mut original)?;
	hexdump("Original content", &original);

	let slogan = pick_slogan(&original);
	writer.write_all(&mut bus, slave, &slogan)?;

	let mut content = vec![0u8; config.device_size];
	writer.read_all(&mut bus, slave, &mut content)?;
	hexdump("New content", &content);

	ensure!(content == slogan, "content read back doesn't match what was written");
	Ok(())
}

fn microwire(sub_m: &clap::ArgMatches) -> AResult<()> {
	let config = MicrowireConfig {
		poll_attempts: get_param(sub_m, "polls")?,
		poll_chunk_len: get_param(sub_m, "chunk")?,
		..Default::default()
	};
	let cycle: u32 = get_param(sub_m, "cycle")?;

	let mut sim = MicrowireEepromSim::new().with_write_cycle(cycle);
	if let Some(stuck) = sub_m.values_of("stuck") {
		for address in stuck {
			let address: u8 = address.parse().map_err(|e| format_err!("invalid stuck address {:?}: {}", address, e))?;
			sim = sim.with_stuck_address(address);
		}
	}
	let mut ee = SerialEepromDriver::from_config(sim, &config)?;

	let mut original = vec![0u8; ee.device_size()];
	if !ee.read_all(&mut original)?.is_complete() {
		warn!("Original content incomplete");
	}
	hexdump("Original content", &original);

	let slogan = pick_slogan(&original);
	let report = {
		let mut programming = ee.start_programming()?;
		let report = programming.write_all(&slogan)?;
		report
	};

	let mut content = vec![0u8; ee.device_size()];
	if !ee.read_all(&mut content)?.is_complete() {
		warn!("New content incomplete");
	}
	hexdump("New content", &content);

	if !report.is_complete() {
		error!("Failed addresses: {:02x?}", report.failed_addresses());
	}
	report.into_result()?;
	Ok(())
}

fn slave(sub_m: &clap::ArgMatches) -> AResult<()> {
	let settle = Duration::from_millis(get_param(sub_m, "settle")?);
	let config = SlaveConfig {
		poll_attempts: get_param(sub_m, "polls")?,
		settle_before: settle,
		settle_after: settle,
		..Default::default()
	};

	let bursts = get_param::<String>(sub_m, "bursts")?
		.split(',')
		.map(|size| size.trim().parse::<usize>().map_err(|e| format_err!("invalid burst size {:?}: {}", size, e)))
		.collect::<AResult<Vec<usize>>>()?;
	let idle: u32 = get_param(sub_m, "idle")?;

	// the master sends lower case text and expects it back in upper case
	let mut message = SLOGAN2.to_ascii_lowercase();
	message.resize(config.frame_len, b' ');
	let mut feed = SlaveFeedSim::new(&message, &bursts, idle);

	let receiver = SlaveFrameReceiver::from_config(&config);
	let frame = receiver.receive(&mut feed)?;
	hexdump("Received", frame.as_slice());

	let reply = receiver.respond(&mut feed, frame, uppercase)?;
	hexdump("Reply", &reply);
	info!("Reply checksum: {:04x}", slave_transfer_checksum(&reply));

	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@subcommand i2c =>
			(about: "write a slogan to a simulated 24LC01B I2C EEPROM and read it back")
			(@arg retries: --retries +takes_value default_value("25") "address probes per page write cycle")
			(@arg cycle: --cycle +takes_value default_value("3") "probes the simulated write cycle takes")
		)
		(@subcommand microwire =>
			(about: "write a slogan to a simulated AT93C46 Microwire EEPROM and read it back")
			(@arg polls: --polls +takes_value default_value("1000") "busy polls per written byte")
			(@arg chunk: --chunk +takes_value default_value("10") "bytes clocked per busy poll")
			(@arg cycle: --cycle +takes_value default_value("2") "polls the simulated write cycle takes")
			(@arg stuck: --stuck +takes_value +multiple "address whose writes never complete")
		)
		(@subcommand slave =>
			(about: "receive a frame as SPI slave from a simulated master and reply in upper case")
			(@arg polls: --polls +takes_value default_value("321123456") "receive polls before giving up")
			(@arg bursts: --bursts +takes_value default_value("30,50,48") "comma separated sizes of the bursts the master sends")
			(@arg idle: --idle +takes_value default_value("5") "empty polls between bursts")
			(@arg settle: --settle +takes_value default_value("1000") "milliseconds to wait before and after sending the reply")
		)
	).get_matches();

	match matches.subcommand() {
		("i2c", Some(sub_m)) => {
			i2c(sub_m)
		},
		("microwire", Some(sub_m)) => {
			microwire(sub_m)
		},
		("slave", Some(sub_m)) => {
			slave(sub_m)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
