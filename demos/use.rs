use avlbst::{AvlTree, BinarySearchTree};

fn main() {
    let mut tree = AvlTree::new();
    tree.insert(0, "zero");
    tree.insert(1, "one");
    tree.insert(2, "two");
    tree.insert(2, "two");
    tree.insert(3, "three");
    tree.insert(4, "four");
    tree.insert(5, "five");
    tree.insert(6, "six");
    assert_eq!(tree.get(&1), Some(&"one"));
    assert_eq!(tree.at(&7).unwrap_or(&"missing"), &"missing");
    tree.remove(&1);
    assert!(tree.get(&1).is_none());

    for (k, v) in &tree {
        println!("{k} => {v}");
    }
    println!("height: {}, equal paths: {}", tree.height(), tree.has_equal_paths());

    if let Some(root) = tree.root() {
        println!("root: {} (balance {})", root.key(), root.balance());
    }

    // Sorted input degenerates the plain tree into a list.
    let plain: BinarySearchTree<i32, ()> = (0..16).map(|k| (k, ())).collect();
    let balanced: AvlTree<i32, ()> = (0..16).map(|k| (k, ())).collect();
    println!(
        "sorted input height: plain {}, avl {}",
        plain.height(),
        balanced.height()
    );
}
