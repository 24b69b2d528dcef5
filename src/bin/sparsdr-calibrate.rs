use std::path::PathBuf;

use clap::Parser;

use sparsdr_calib::calibration::{
    calibrate_noise_floor, conservative_shift_exact, dynamic_range_loss_db, CalibrationRecord,
};
use sparsdr_calib::clip_check::{read_cshort, suggest_rxgain};
use sparsdr_calib::decode::{V1Decoder, V2Decoder};
use sparsdr_calib::nfft::Nfft;

#[derive(Parser, Debug)]
#[command(name = "sparsdr-calibrate", about = "SparSDR noise-floor calibration tool")]
struct CalibrateArgs {
    /// Directory holding one average capture per shift plus clipCheck.iq.
    #[arg(long = "avgFolder", default_value = "/tmp/plutoSparSDRFiles/")]
    avg_folder: PathBuf,

    /// Decode captures as V2 word streams instead of V1 fixed records.
    #[arg(long = "v2")]
    v2: bool,

    /// FFT size used by the captures.
    #[arg(long = "nfft", default_value_t = 1024)]
    nfft: usize,

    /// Receiver gain the captures were taken at.
    #[arg(long = "rxgain", default_value_t = 30)]
    rxgain: i32,

    /// Estimated peak-to-average power ratio of the target signal, in dB.
    #[arg(long = "papr", default_value_t = 0.0)]
    papr_db: f64,

    /// Estimated occupied bandwidth of the target signal, in MHz.
    #[arg(long = "bwmhz", default_value_t = 0.01)]
    bw_mhz: f64,

    /// Read `<avgFolder>/clipCheck.iq` and suggest a gain instead of calibrating.
    #[arg(long = "clipCheck")]
    clip_check: bool,

    /// Reserved for a future plotting backend; accepted but ignored.
    #[arg(long = "plot")]
    plot: bool,

    /// Output path for the generated threshold config.
    #[arg(long = "out", default_value = "thresholdConfig.txt")]
    out: PathBuf,
}

fn run_clip_check(avg_folder: &PathBuf, rxgain: i32) -> Result<(), Box<dyn std::error::Error>> {
    let path = avg_folder.join("clipCheck.iq");
    let data = std::fs::read(&path)?;
    let samples = read_cshort(&data)?;
    let suggested = suggest_rxgain(&samples, rxgain);
    println!("{}", suggested);
    Ok(())
}

fn load_avg_captures(
    avg_folder: &PathBuf,
    rxgain: i32,
    nfft: Nfft,
    v2: bool,
) -> Result<Vec<(u8, Vec<u32>)>, Box<dyn std::error::Error>> {
    let mut captures = Vec::new();
    for shift in (0..=7u8).rev() {
        let path = avg_folder.join(format!("avgSamples.dat_{}_{}", shift, rxgain));
        if !path.exists() {
            continue;
        }
        let data = std::fs::read(&path)?;
        let magnitudes = if v2 {
            let mut decoder = V2Decoder::new(nfft);
            decoder
                .decode_all(&data)?
                .into_iter()
                .filter_map(|s| s.as_avg())
                .map(|a| a.magnitude)
                .collect()
        } else {
            let mut decoder = V1Decoder::new(nfft);
            decoder
                .decode_all(&data)?
                .into_iter()
                .filter_map(|s| s.as_avg())
                .map(|a| a.magnitude)
                .collect()
        };
        log::info!("loaded {} avg samples for shift {}", magnitudes.len(), shift);
        captures.push((shift, magnitudes));
    }
    if captures.is_empty() {
        return Err(format!(
            "no avgSamples.dat_<shift>_{} files found under {}",
            rxgain,
            avg_folder.display()
        )
        .into());
    }
    Ok(captures)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = CalibrateArgs::parse();

    if args.clip_check {
        return run_clip_check(&args.avg_folder, args.rxgain);
    }

    let nfft = Nfft::new(args.nfft)?;
    let captures = load_avg_captures(&args.avg_folder, args.rxgain, nfft, args.v2)?;
    let fit = calibrate_noise_floor(&captures, nfft)?;
    if fit.degraded {
        log::warn!(
            "no shift produced a fully non-negative noise floor; falling back to degraded shift {}",
            fit.shift
        );
    }
    log::info!("selected shift {} from noise-floor fit", fit.shift);

    let conservative = conservative_shift_exact(nfft.get(), args.bw_mhz, args.papr_db);
    let used_shift = fit.shift as i32;
    let delta = used_shift - conservative.ceil() as i32;
    if delta > 0 {
        log::warn!(
            "used shift {} is {} above conservative shift {:.3}: ~{:.1} dB of dynamic range lost",
            used_shift,
            delta,
            conservative,
            dynamic_range_loss_db(delta)
        );
    } else if (conservative.ceil() as i32) > used_shift {
        log::warn!(
            "used shift {} is below conservative shift {:.3}: possible numeric overflow",
            used_shift,
            conservative
        );
    }

    let record = CalibrationRecord {
        rx_gain_db: args.rxgain,
        est_papr_db: args.papr_db,
        est_bw_mhz: args.bw_mhz,
        conservative_shift: conservative,
        suggested_shift: fit.shift,
        bins: fit.thresholds,
    };
    std::fs::write(&args.out, record.to_text())?;
    println!("wrote calibration to {}", args.out.display());

    if args.plot {
        log::info!("--plot has no backend in this build; skipping");
    }

    Ok(())
}
