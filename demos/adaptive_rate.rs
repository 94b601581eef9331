//! Prints how each adaptive mode maps a test error to a learning rate.

use dlnet::schedule::{ERROR_THRESHOLD, MIN_LEARNING_RATE};
use dlnet::{AdaptiveRate, LearningRateController};

fn main() -> dlnet::Result<()> {
    let initial = 0.5;
    let errors = [0.2_f32, 0.05, 0.034, 0.02, 0.01, 0.005, 0.0];

    println!("initial rate {initial}, threshold {ERROR_THRESHOLD}, floor {MIN_LEARNING_RATE}");
    print!("{:>10}", "error");
    for e in errors {
        print!("{e:>10}");
    }
    println!();

    for mode in [
        AdaptiveRate::None,
        AdaptiveRate::Linear,
        AdaptiveRate::Quadratic,
        AdaptiveRate::Sqrt,
    ] {
        print!("{:>10}", format!("{mode:?}"));
        for e in errors {
            // Fresh controller per error: the schedule does not depend on history.
            let mut ctl = LearningRateController::new(initial, mode)?;
            print!("{:>10.5}", ctl.update(e));
        }
        println!();
    }

    Ok(())
}
