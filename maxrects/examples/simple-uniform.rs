use maxrects::{InputItem, MaxRectsPacker};

fn main() {
    env_logger::init();

    let inputs: Vec<_> = (0..5).map(|_| InputItem::new((128, 128))).collect();

    let packer = MaxRectsPacker::new().min_size((256, 256));
    let result = packer.pack(inputs);

    println!("Pack result: {:#?}", result);
}
