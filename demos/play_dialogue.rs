//! Play a small dialogue, always picking the first option.

use yarn_dialogue::{DialogueResult, Runner, YarnNode};

fn main() {
    let mut runner = Runner::new()
        .with_nodes([
            YarnNode::new(
                "Start",
                "<<set $gold = 3>>\n\
                 Merchant: Welcome, traveller.\n\
                 -> Browse the wares\n\
                 \tMerchant: Take your time.\n\
                 \t[[Buy a sword|Sword]] <<if $gold >= 10>>\n\
                 \t[[Buy bread|Bread]]\n\
                 -> Leave\n\
                 \t<<stop>>",
            ),
            YarnNode::new("Sword", "You buy a sword.\n<<set $gold -= 10>>"),
            YarnNode::new("Bread", "You buy bread.\n<<set $gold -= 1>>\n<<play_sound coin>>"),
        ]);

    for result in runner.run_default() {
        match result {
            Ok(DialogueResult::Text(text)) => println!("{}", text.text),
            Ok(DialogueResult::Command(command)) => println!("[command] {}", command.text),
            Ok(DialogueResult::Options(options)) => {
                for (i, option) in options.options.iter().enumerate() {
                    println!("  {i}: {option}");
                }
                if let Err(e) = options.select(0) {
                    eprintln!("select failed: {e}");
                    break;
                }
            }
            Ok(DialogueResult::NodeComplete(done)) => println!("-- end of {} --", done.title),
            Err(e) => {
                eprintln!("error: {e}");
                break;
            }
        }
    }

    if let Some(gold) = runner.variables().get("gold") {
        println!("Gold left: {gold}");
    }
}
